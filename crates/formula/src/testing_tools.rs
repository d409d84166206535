use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};

/// Every label attached to `diagnostic`, as `(label, offset, length)`
pub(crate) fn labels(diagnostic: &dyn Diagnostic) -> Vec<(String, usize, usize)> {
    diagnostic
        .labels()
        .into_iter()
        .flatten()
        .map(|l| (l.label().unwrap_or_default().to_owned(), l.offset(), l.len()))
        .collect()
}

/// Renders `diagnostic` the way the CLI would, minus the colours
pub(crate) fn render(diagnostic: &dyn Diagnostic) -> String {
    let mut out = String::new();
    GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
        .with_width(80)
        .render_report(&mut out, diagnostic)
        .unwrap();
    out
}

macro_rules! assert_labels {
    ($diag:expr, [$(($label:literal, $offset:literal, $len:literal)),* $(,)?]) => {{
        let diagnostic = $diag;
        let expected: Vec<(String, usize, usize)> = vec![$(($label.to_owned(), $offset, $len)),*];
        assert_eq!($crate::testing_tools::labels(&diagnostic), expected, "{}", stringify!($diag));
        // NOTE: Rendering panics if a label points outside of the source code
        let rendered = $crate::testing_tools::render(&diagnostic);
        for (label, _, _) in expected {
            assert!(rendered.contains(&label), "{rendered}");
        }
    }};
}

pub(crate) use assert_labels;
