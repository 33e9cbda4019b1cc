use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const CONFIG_ENV: &str =
  "TICKLIST_CONFIG";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  /// Built-in defaults only.
  pub fn defaults() -> Self {
    let mut cfg = Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    };

    cfg.map.insert(
      "accent.debounce_ms".to_string(),
      "250".to_string()
    );
    cfg.map.insert(
      "editor.origin.x".to_string(),
      "0".to_string()
    );
    cfg.map.insert(
      "editor.origin.y".to_string(),
      "400".to_string()
    );
    cfg.map.insert(
      "login.enabled".to_string(),
      "false".to_string()
    );

    cfg
  }

  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::defaults();

    let path = resolve_config_path(
      config_override
    )?;
    if let Some(path) = path {
      info!(config = %path.display(), "loading config");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no config file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  /// Parses a value, falling back to
  /// `default` with a warning when the
  /// stored text does not parse.
  pub fn get_parsed<T>(
    &self,
    key: &str,
    default: T
  ) -> T
  where
    T: FromStr
  {
    let Some(raw) = self.map.get(key)
    else {
      return default;
    };
    match raw.trim().parse() {
      Ok(value) => value,
      Err(_) => {
        warn!(key, value = %raw, "unparseable config value; using default");
        default
      }
    }
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self.load_str(&text).with_context(
      || {
        format!(
          "invalid config file {}",
          path.display()
        )
      }
    )?;
    self.loaded_files.push(path);
    Ok(())
  }

  /// Merges a TOML document, flattening
  /// nested tables to dotted keys.
  pub fn load_str(
    &mut self,
    text: &str
  ) -> anyhow::Result<()> {
    let table: toml::Table =
      toml::from_str(text)?;
    let mut flat = Vec::new();
    flatten("", &table, &mut flat)?;

    for (key, value) in flat {
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }
    Ok(())
  }
}

fn flatten(
  prefix: &str,
  table: &toml::Table,
  out: &mut Vec<(String, String)>
) -> anyhow::Result<()> {
  for (name, value) in table {
    let key = if prefix.is_empty() {
      name.clone()
    } else {
      format!("{prefix}.{name}")
    };

    let text = match value {
      toml::Value::Table(inner) => {
        flatten(&key, inner, out)?;
        continue;
      }
      toml::Value::String(s) => {
        s.clone()
      }
      toml::Value::Integer(i) => {
        i.to_string()
      }
      toml::Value::Float(f) => {
        f.to_string()
      }
      toml::Value::Boolean(b) => {
        b.to_string()
      }
      other => {
        return Err(anyhow!(
          "unsupported value for \
           {key}: {other:?}"
        ));
      }
    };
    out.push((key, text));
  }
  Ok(())
}

/// What the stdio host tells us about
/// the desktop it runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
  pub editor_origin:  (i32, i32),
  pub accent_color:   Option<String>,
  pub login_enabled:  bool,
  pub accent_debounce: Duration
}

impl HostSettings {
  pub fn from_config(
    cfg: &Config
  ) -> Self {
    let debounce_ms = cfg.get_parsed(
      "accent.debounce_ms",
      250_u64
    );
    Self {
      editor_origin:  (
        cfg.get_parsed(
          "editor.origin.x",
          0
        ),
        cfg.get_parsed(
          "editor.origin.y",
          400
        )
      ),
      accent_color:   cfg
        .get("accent.color")
        .filter(|c| !c.trim().is_empty()),
      login_enabled:  cfg
        .get_bool("login.enabled")
        .unwrap_or(false),
      accent_debounce:
        Duration::from_millis(
          debounce_ms
        )
    }
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(from_env) =
    std::env::var(CONFIG_ENV)
  {
    if from_env == "/dev/null"
      || from_env.is_empty()
    {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      from_env
    )));
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    warn!(
      "cannot determine config \
       directory"
    );
    return Ok(None);
  };
  let candidate = config_dir
    .join("ticklist")
    .join("ticklist.toml");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let base = dirs::data_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine data \
         directory"
      )
    })?;
  Ok(base.join("ticklist"))
}

pub fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

/// Strict boolean spelling: `None` when
/// the text is neither a yes nor a no.
pub fn parse_flag(
  s: &str
) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on" | "true" => {
      Some(true)
    }
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

pub fn parse_bool(s: &str) -> bool {
  parse_flag(s).unwrap_or(false)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn toml_tables_flatten_to_dotted_keys() {
    let mut cfg = Config::defaults();
    cfg
      .load_str(
        r#"
[data]
location = "/tmp/ticklist-data"

[accent]
debounce_ms = 100
color = "0a84ffff"

[editor.origin]
y = 900
"#
      )
      .expect("parse toml");

    assert_eq!(
      cfg.get("data.location").as_deref(),
      Some("/tmp/ticklist-data")
    );
    let host =
      HostSettings::from_config(&cfg);
    assert_eq!(
      host.editor_origin,
      (0, 900)
    );
    assert_eq!(
      host.accent_debounce,
      Duration::from_millis(100)
    );
    assert_eq!(
      host.accent_color.as_deref(),
      Some("0a84ffff")
    );
  }

  #[test]
  fn overrides_win_and_strip_rc_prefix()
  {
    let mut cfg = Config::defaults();
    cfg.apply_overrides([
      (
        "rc.login.enabled".to_string(),
        "yes".to_string()
      ),
      (
        "accent.debounce_ms".to_string(),
        "soon".to_string()
      )
    ]);

    let host =
      HostSettings::from_config(&cfg);
    assert!(host.login_enabled);
    assert_eq!(
      host.accent_debounce,
      Duration::from_millis(250),
      "bad numbers fall back"
    );
  }

  #[test]
  fn flags_accept_both_spellings() {
    for yes in ["1", "Y", " yes ", "ON", "true"] {
      assert_eq!(parse_flag(yes), Some(true));
    }
    for no in ["0", "n", "No", "off", "FALSE"] {
      assert_eq!(parse_flag(no), Some(false));
    }
    assert_eq!(parse_flag("maybe"), None);
    assert!(!parse_bool("maybe"));
  }

  #[test]
  fn arrays_are_rejected() {
    let mut cfg = Config::defaults();
    assert!(
      cfg
        .load_str("items = [1, 2]")
        .is_err()
    );
  }

  #[test]
  fn data_dir_override_is_created() {
    let tmp = tempfile::tempdir()
      .expect("tempdir");
    let target = tmp.path().join("nested");
    let dir = resolve_data_dir(
      &Config::defaults(),
      Some(&target)
    )
    .expect("resolve");
    assert_eq!(dir, target);
    assert!(dir.is_dir());
  }
}
