use std::path::{Path, PathBuf};

use knuffel::Decode;
use miette::{IntoDiagnostic, Result, WrapErr};

pub const DEFAULT_CONFIG: &str = "msdb.kdl";

// Public API ==========================================================================================================

/// Where `msdb populate` finds its data, and which elements adducts may adjust
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Config {
    pub adducts: Option<PathBuf>,
    pub compounds: Option<PathBuf>,
    pub measurements: Option<PathBuf>,
    pub atomic_database: Option<PathBuf>,
    /// Element symbols that adducts may add or remove; `None` keeps the library default
    pub whitelist: Option<Vec<String>>,
}

impl Config {
    /// # Errors
    ///
    /// Fails on malformed KDL, or on nodes and arguments that don't fit the configuration schema
    pub fn from_kdl(file_name: impl AsRef<str>, text: impl AsRef<str>) -> Result<Self, knuffel::Error> {
        let parsed: ConfigKdl = knuffel::parse(file_name.as_ref(), text.as_ref())?;
        Ok(parsed.into())
    }

    /// Reads the configuration at `path` or, without one, the `msdb.kdl` in the working directory (if there is one)
    ///
    /// Relative paths inside the file are resolved against the directory that the file lives in.
    ///
    /// # Errors
    ///
    /// Fails if an explicitly requested file can't be read, or if any file that is read can't be decoded
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG).exists() => Path::new(DEFAULT_CONFIG),
            None => return Ok(Self::default()),
        };

        let text = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read the configuration file {}", path.display()))?;
        let config = Self::from_kdl(path.display().to_string(), text)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(base))
    }

    #[must_use]
    pub fn relative_to(self, base: &Path) -> Self {
        let resolve = |path: Option<PathBuf>| path.map(|p| base.join(p));
        Self {
            adducts: resolve(self.adducts),
            compounds: resolve(self.compounds),
            measurements: resolve(self.measurements),
            atomic_database: resolve(self.atomic_database),
            whitelist: self.whitelist,
        }
    }
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
struct ConfigKdl {
    #[knuffel(child, unwrap(argument))]
    adducts: Option<String>,
    #[knuffel(child, unwrap(argument))]
    compounds: Option<String>,
    #[knuffel(child, unwrap(argument))]
    measurements: Option<String>,
    #[knuffel(child, unwrap(argument))]
    atomic_database: Option<String>,
    #[knuffel(child)]
    whitelist: Option<WhitelistKdl>,
}

#[derive(Debug, Decode)]
struct WhitelistKdl {
    #[knuffel(children)]
    elements: Vec<ElementKdl>,
}

#[derive(Debug, Decode)]
struct ElementKdl {
    #[knuffel(node_name)]
    symbol: String,
}

impl From<ConfigKdl> for Config {
    fn from(
        ConfigKdl {
            adducts,
            compounds,
            measurements,
            atomic_database,
            whitelist,
        }: ConfigKdl,
    ) -> Self {
        Self {
            adducts: adducts.map(PathBuf::from),
            compounds: compounds.map(PathBuf::from),
            measurements: measurements.map(PathBuf::from),
            atomic_database: atomic_database.map(PathBuf::from),
            whitelist: whitelist.map(|w| w.elements.into_iter().map(|e| e.symbol).collect()),
        }
    }
}
