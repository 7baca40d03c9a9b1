use std::fmt::Debug;
use std::io::Write;
use std::panic::Location;

use env_logger::fmt::Formatter;
use log::kv::{Key, Value, VisitSource};
use log::{Level, LevelFilter, Record};

/// Sets up `env_logger` with `info` as the default filter. `RUST_LOG`
/// overrides it as usual.
pub fn init() {
  env_logger::Builder::new()
    .filter_level(LevelFilter::Info)
    .parse_default_env()
    .format(format)
    .init();
}

fn format(buf: &mut Formatter, record: &Record) -> std::io::Result<()> {
  let style = buf.default_level_style(record.level());
  let mut pairs = Pairs(String::new());
  // A failing visitor only loses the trailing pairs.
  let _ = record.key_values().visit(&mut pairs);

  writeln!(
    buf,
    "{} {style}{:<5}{style:#} {}: {}{}",
    buf.timestamp_seconds(),
    record.level(),
    record.target(),
    record.args(),
    pairs.0,
  )
}

struct Pairs(String);

impl<'kvs> VisitSource<'kvs> for Pairs {
  fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), log::kv::Error> {
    self.0.push_str(&format!(" {key}={value}"));
    Ok(())
  }
}

/// Logs the empty or failed case at the given level and turns it into an
/// [`anyhow::Error`] carrying the message.
pub trait LogExt<T> {
  fn log_at(self, level: Level, msg: &str) -> anyhow::Result<T>;

  #[track_caller]
  fn log_debug(self, msg: &str) -> anyhow::Result<T>
  where
    Self: Sized,
  {
    self.log_at(Level::Debug, msg)
  }

  #[track_caller]
  fn log_warn(self, msg: &str) -> anyhow::Result<T>
  where
    Self: Sized,
  {
    self.log_at(Level::Warn, msg)
  }

  #[track_caller]
  fn log_error(self, msg: &str) -> anyhow::Result<T>
  where
    Self: Sized,
  {
    self.log_at(Level::Error, msg)
  }
}

impl<T> LogExt<T> for Option<T> {
  #[track_caller]
  fn log_at(self, level: Level, msg: &str) -> anyhow::Result<T> {
    let Some(value) = self else {
      let location = Location::caller().to_string();
      log::log!(level, location; "{msg}");
      anyhow::bail!(msg.to_string())
    };

    Ok(value)
  }
}

impl<T, E: Debug> LogExt<T> for Result<T, E> {
  #[track_caller]
  fn log_at(self, level: Level, msg: &str) -> anyhow::Result<T> {
    match self {
      Ok(value) => Ok(value),
      Err(error) => {
        let location = Location::caller().to_string();
        log::log!(level, location; "{msg}: {error:?}");
        anyhow::bail!("{msg}: {error:?}")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn passes_values_through() {
    assert_eq!(Some(3).log_warn("missing").unwrap(), 3);
    assert_eq!(Ok::<_, String>("page").log_error("failed").unwrap(), "page");
  }

  #[test]
  fn keeps_the_message_and_cause() {
    let none = None::<u8>.log_debug("Scroll position is not a number").unwrap_err();
    let err = Err::<(), _>("connection reset").log_error("Could not open tab").unwrap_err();

    assert_eq!(none.to_string(), "Scroll position is not a number");
    assert_eq!(err.to_string(), "Could not open tab: \"connection reset\"");
  }
}
