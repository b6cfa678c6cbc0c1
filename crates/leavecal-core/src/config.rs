use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow,
  bail
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const RC_ENV_VAR: &str =
  "LEAVECALRC";
const RC_FILE_NAME: &str =
  ".leavecalrc";

/// Keys understood in a leavecalrc.
pub mod keys {
  pub const DATA_LOCATION: &str =
    "data.location";
  pub const LEAVES_FILE: &str =
    "data.leaves";
  pub const HOLIDAYS_FILE: &str =
    "data.holidays";
  pub const COLOR: &str = "color";
  pub const TIMEZONE: &str =
    "calendar.timezone";
  pub const UPCOMING_HOLIDAYS: &str =
    "holidays.upcoming";
  pub const CLASSIFY_RULES: &str =
    "classify.rules";
}

const DEFAULTS: [(&str, &str); 5] = [
  (keys::DATA_LOCATION, "~/.leavecal"),
  (keys::LEAVES_FILE, "leaves.json"),
  (
    keys::HOLIDAYS_FILE,
    "holidays.json"
  ),
  (keys::COLOR, "on"),
  (keys::UPCOMING_HOLIDAYS, "5")
];

fn default_for(
  key: &str
) -> Option<&'static str> {
  DEFAULTS
    .iter()
    .find(|(name, _)| *name == key)
    .map(|(_, value)| *value)
}

/// Settings from the rc file chain plus command-line overrides.
#[derive(Debug, Clone)]
pub struct Config {
  settings:         HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      settings:     DEFAULTS
        .iter()
        .map(|(key, value)| {
          (
            key.to_string(),
            value.to_string()
          )
        })
        .collect(),
      loaded_files: Vec::new()
    }
  }
}

/// One meaningful line of a leavecalrc.
#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Include(&'a str),
  Setting(&'a str, &'a str)
}

fn parse_rc_line(
  raw: &str
) -> Result<Option<RcLine<'_>>, String>
{
  let line = raw
    .split_once('#')
    .map_or(raw, |(before, _)| before)
    .trim();
  if line.is_empty() {
    return Ok(None);
  }
  if let Some(path) =
    line.strip_prefix("include ")
  {
    let path = path.trim();
    if path.is_empty() {
      return Err(
        "include path cannot be empty"
          .to_string()
      );
    }
    return Ok(Some(RcLine::Include(
      path
    )));
  }
  match line.split_once('=') {
    | Some((key, value))
      if !key.trim().is_empty() =>
    {
      Ok(Some(RcLine::Setting(
        key.trim(),
        value.trim()
      )))
    }
    | _ => {
      Err(format!(
        "expected `key = value`, got \
         {line:?}"
      ))
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    match locate_rc(rc_override) {
      | Some(path) => {
        info!(rc = %path.display(), "loading leavecalrc");
        cfg.read_rc(&path)?;
      }
      | None => {
        debug!(
          "no leavecalrc found; using \
           defaults"
        );
      }
    }

    Ok(cfg)
  }

  /// Applies `key=value` pairs from the command line; a leading `rc.` is
  /// dropped.
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
    for (raw_key, value) in overrides {
      let key = raw_key
        .strip_prefix("rc.")
        .unwrap_or(&raw_key)
        .to_string();
      debug!(key = %key, value = %value, "applying override");
      self.settings.insert(key, value);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<&str> {
    self
      .settings
      .get(key)
      .map(String::as_str)
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    let Some(raw) = self.get(key) else {
      return Ok(None);
    };
    parse_bool(raw)
      .map(Some)
      .ok_or_else(|| {
        anyhow!(
          "config key {key} expects \
           on/off, got {raw:?}"
        )
      })
  }

  pub fn get_usize(
    &self,
    key: &str
  ) -> anyhow::Result<Option<usize>> {
    let Some(raw) = self.get(key) else {
      return Ok(None);
    };
    raw
      .trim()
      .parse::<usize>()
      .map(Some)
      .with_context(|| {
        format!(
          "config key {key} expects \
           a non-negative integer, \
           got {raw:?}"
        )
      })
  }

  /// A path-valued key with `~/` expanded; empty values count as unset.
  pub fn get_path(
    &self,
    key: &str
  ) -> Option<PathBuf> {
    self
      .get(key)
      .map(str::trim)
      .filter(|raw| !raw.is_empty())
      .map(|raw| {
        expand_tilde(Path::new(raw))
      })
  }

  pub fn color_enabled(
    &self
  ) -> anyhow::Result<bool> {
    Ok(
      self
        .get_bool(keys::COLOR)?
        .unwrap_or(true)
    )
  }

  pub fn timezone(
    &self
  ) -> Option<&str> {
    self.get(keys::TIMEZONE)
  }

  pub fn upcoming_limit(
    &self
  ) -> anyhow::Result<usize> {
    Ok(
      self
        .get_usize(
          keys::UPCOMING_HOLIDAYS
        )?
        .unwrap_or(5)
    )
  }

  pub fn classify_rules(
    &self
  ) -> Option<PathBuf> {
    self.get_path(keys::CLASSIFY_RULES)
  }

  /// Directory the snapshot files are read from. It is never created.
  #[tracing::instrument(skip(
    self,
    override_dir
  ))]
  pub fn data_dir(
    &self,
    override_dir: Option<&Path>
  ) -> anyhow::Result<PathBuf> {
    let dir = match override_dir {
      | Some(path) => path.to_path_buf(),
      | None => self
        .get_path(keys::DATA_LOCATION)
        .map(Ok)
        .unwrap_or_else(|| {
          dirs::home_dir()
            .map(|home| {
              home.join(".leavecal")
            })
            .ok_or_else(|| {
              anyhow!(
                "cannot determine home \
                 directory"
              )
            })
        })?
    };

    if !dir.is_dir() {
      warn!(dir = %dir.display(), "data directory does not exist");
    }
    Ok(dir)
  }

  /// Snapshot file named by `key`, relative to `data_dir` unless absolute.
  pub fn data_file(
    &self,
    data_dir: &Path,
    key: &str
  ) -> PathBuf {
    let file = self
      .get_path(key)
      .or_else(|| {
        default_for(key).map(PathBuf::from)
      })
      .unwrap_or_else(|| {
        PathBuf::from(key)
      });
    if file.is_absolute() {
      file
    } else {
      data_dir.join(file)
    }
  }

  #[tracing::instrument(skip(self))]
  fn read_rc(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    if self.loaded_files.contains(&path)
    {
      bail!(
        "include cycle at {}",
        path.display()
      );
    }
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map_or_else(
        || PathBuf::from("."),
        Path::to_path_buf
      );

    for (idx, raw_line) in
      text.lines().enumerate()
    {
      let parsed = parse_rc_line(
        raw_line
      )
      .map_err(|reason| {
        anyhow!(
          "invalid config line {}:{}: \
           {reason}",
          path.display(),
          idx + 1
        )
      })?;

      match parsed {
        | None => {}
        | Some(RcLine::Include(
          include
        )) => {
          let include_path = {
            let expanded = expand_tilde(
              Path::new(include)
            );
            if expanded.is_absolute() {
              expanded
            } else {
              base_dir.join(expanded)
            }
          };
          if include_path.exists() {
            self.read_rc(&include_path)?;
          } else {
            warn!(include = %include_path.display(), "include file does not exist; skipping");
          }
        }
        | Some(RcLine::Setting(
          key,
          value
        )) => {
          trace!(key, value, "loaded config key");
          self.settings.insert(
            key.to_string(),
            value.to_string()
          );
        }
      }
    }

    Ok(())
  }
}

/// `--leavecalrc`, then `$LEAVECALRC` (`/dev/null` disables), then
/// `~/.leavecalrc` if present.
fn locate_rc(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(from_env) =
    std::env::var(RC_ENV_VAR)
  {
    return (from_env != "/dev/null")
      .then(|| PathBuf::from(from_env));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping rc lookup"
    );
    return None;
  };
  Some(home.join(RC_FILE_NAME))
    .filter(|candidate| {
      candidate.is_file()
    })
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  if let Ok(rest) =
    path.strip_prefix("~")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(
  raw: &str
) -> Option<bool> {
  match raw
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::*;

  #[test]
  fn loads_rc_with_includes_and_comments(
  ) {
    let dir = tempdir().expect("tempdir");
    let extra = dir.path().join("extra.rc");
    fs::write(
      &extra,
      "holidays.upcoming = 3\n\
       classify.rules = rules.toml\n"
    )
    .expect("write include");
    let rc = dir.path().join("main.rc");
    fs::write(
      &rc,
      "# leave calendar\n\
       color = off   # no ansi\n\
       calendar.timezone = Asia/Kolkata\n\
       include extra.rc\n\
       include missing.rc\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(&rc))
      .expect("load rc");
    assert!(!cfg
      .color_enabled()
      .expect("valid color"));
    assert_eq!(
      cfg.timezone(),
      Some("Asia/Kolkata")
    );
    assert_eq!(
      cfg
        .upcoming_limit()
        .expect("valid number"),
      3
    );
    assert_eq!(
      cfg.classify_rules(),
      Some(PathBuf::from("rules.toml"))
    );
    assert_eq!(
      cfg.get(keys::LEAVES_FILE),
      Some("leaves.json")
    );
    assert_eq!(cfg.loaded_files.len(), 2);
  }

  #[test]
  fn rejects_lines_without_equals() {
    let dir = tempdir().expect("tempdir");
    let rc = dir.path().join("bad.rc");
    fs::write(&rc, "color on\n")
      .expect("write rc");
    let err = Config::load(Some(&rc))
      .expect_err("invalid line");
    assert!(err
      .to_string()
      .contains("invalid config line"));
  }

  #[test]
  fn include_cycle_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let rc = dir.path().join("loop.rc");
    fs::write(&rc, "include loop.rc\n")
      .expect("write rc");
    let err = Config::load(Some(&rc))
      .expect_err("cycle");
    assert!(format!("{err:#}")
      .contains("include cycle"));
  }

  #[test]
  fn invalid_color_is_an_error() {
    let mut cfg = Config::default();
    assert!(cfg
      .color_enabled()
      .expect("default color"));
    cfg.apply_overrides([(
      "rc.color".to_string(),
      "purple".to_string()
    )]);
    let err = cfg
      .color_enabled()
      .expect_err("bad color");
    assert!(err
      .to_string()
      .contains("expects on/off"));
  }

  #[test]
  fn data_files_resolve_against_the_data_dir(
  ) {
    let mut cfg = Config::default();
    cfg.apply_overrides([
      (
        "rc.data.leaves".to_string(),
        "/tmp/leaves.json".to_string()
      ),
      (
        "holidays.upcoming".to_string(),
        "many".to_string()
      ),
    ]);
    let data_dir = Path::new("/srv/hr");
    assert_eq!(
      cfg.data_file(
        data_dir,
        keys::LEAVES_FILE
      ),
      PathBuf::from("/tmp/leaves.json")
    );
    assert_eq!(
      cfg.data_file(
        data_dir,
        keys::HOLIDAYS_FILE
      ),
      data_dir.join("holidays.json")
    );
    assert!(cfg.upcoming_limit().is_err());
    assert_eq!(
      cfg
        .data_dir(Some(data_dir))
        .expect("override dir"),
      data_dir
    );
  }

  #[test]
  fn rc_lines_parse_into_settings_and_includes(
  ) {
    assert_eq!(
      parse_rc_line("  # comment"),
      Ok(None)
    );
    assert_eq!(
      parse_rc_line("include  extra.rc "),
      Ok(Some(RcLine::Include(
        "extra.rc"
      )))
    );
    assert_eq!(
      parse_rc_line("color = on # tty"),
      Ok(Some(RcLine::Setting(
        "color", "on"
      )))
    );
    assert!(parse_rc_line("= on").is_err());
    assert!(
      parse_rc_line("include ").is_err()
    );
  }
}
