use formula::{AtomicDatabase, Formula, Result, measured_formula};
use miette::{GraphicalReportHandler, GraphicalTheme, IntoDiagnostic};
use rustyline::{DefaultEditor, error::ReadlineError};

pub fn run(db: &AtomicDatabase) -> miette::Result<()> {
    let mut rl = DefaultEditor::new().into_diagnostic()?;
    loop {
        let line = match rl.readline("Formula [Adduct]: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(()),
            Err(error) => return Err(error).into_diagnostic(),
        };
        if line.trim().is_empty() {
            continue;
        }

        rl.add_history_entry(&line).into_diagnostic()?;
        match describe(db, &line) {
            Ok(info) => print!("{info}"),
            Err(diagnostic) => render_error(*diagnostic),
        }
    }
}

fn describe(db: &AtomicDatabase, line: &str) -> Result<String> {
    let mut words = line.split_whitespace();
    let formula = words.next().unwrap_or_default();

    let molecule = Formula::normalized(db, formula).map_err(|e| Box::new(e.into()))?;
    let mass = f64::from(molecule.monoisotopic_mass(db).map_err(|e| Box::new(e.into()))?);
    let mut info = format!("Formula: {molecule}\nMonoisotopic Mass: {mass:.6}\n");

    if let Some(adduct) = words.next() {
        let measured = measured_formula(db, formula, adduct)?;
        let mass = f64::from(measured.monoisotopic_mass(db).map_err(|e| Box::new(e.into()))?);
        info.push_str(&format!(
            "Measured Formula: {}\nMeasured Monoisotopic Mass: {mass:.6}\n",
            measured.isotope_notation()
        ));
    }

    info.push('\n');
    Ok(info)
}

fn render_error(diagnostic: formula::Error) {
    let mut buf = String::new();
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode());
    match handler.render_report(&mut buf, &diagnostic) {
        Ok(()) => println!("{buf}"),
        Err(_) => println!("{diagnostic}\n"),
    }
}
