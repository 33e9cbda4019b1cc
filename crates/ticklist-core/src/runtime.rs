use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{
  AsyncBufRead,
  AsyncBufReadExt
};
use tokio::time::{
  Instant,
  sleep_until
};
use tracing::{
  debug,
  error,
  info,
  warn
};

use crate::app::{
  App,
  AppEvent,
  Flow
};
use crate::host::HostInput;

#[derive(Debug, Clone, Copy)]
pub struct HostLoopOptions {
  /// Quiet period after the last theme
  /// change before windows are told
  /// about the new accent colour.
  pub accent_debounce: Duration
}

/// Reads host lines until the host hangs
/// up, asks to quit, or `shutdown`
/// resolves. Events are handled one at a
/// time, each to completion.
#[tracing::instrument(skip_all)]
pub async fn run_host<R, S>(
  app: &mut App,
  input: R,
  options: HostLoopOptions,
  shutdown: S
) -> anyhow::Result<()>
where
  R: AsyncBufRead + Unpin,
  S: Future<Output = ()>
{
  let mut lines = input.lines();
  let mut accent_deadline: Option<
    Instant
  > = None;
  let mut reported_accent: Option<
    String
  > = None;
  tokio::pin!(shutdown);

  loop {
    let accent_due = async move {
      match accent_deadline {
        | Some(at) => sleep_until(at).await,
        | None => {
          std::future::pending::<()>()
            .await
        }
      }
    };

    tokio::select! {
      () = &mut shutdown => {
        warn!("received shutdown signal; leaving host loop");
        break;
      }
      () = accent_due => {
        accent_deadline = None;
        let accent = reported_accent.take();
        if deliver(app, AppEvent::AccentColorChanged { accent }) == Flow::Exit {
          break;
        }
      }
      line = lines.next_line() => {
        let Some(line) = line.context("failed to read host input")? else {
          info!("host closed its end of the pipe");
          break;
        };
        match parse_line(&line) {
          | Some(HostInput::ThemeChanged { accent }) => {
            debug!(?accent, "theme changed; restarting accent debounce");
            if accent.is_some() {
              reported_accent = accent;
            }
            accent_deadline = Some(Instant::now() + options.accent_debounce);
          }
          | Some(input) => {
            if let Some(event) = input.into_event()
              && deliver(app, event) == Flow::Exit
            {
              break;
            }
          }
          | None => {}
        }
      }
    }
  }

  info!("host loop finished");
  Ok(())
}

fn parse_line(
  line: &str
) -> Option<HostInput> {
  let trimmed = line.trim();
  if trimmed.is_empty() {
    return None;
  }
  match serde_json::from_str(trimmed) {
    | Ok(input) => Some(input),
    | Err(err) => {
      warn!(error = %err, line = %trimmed, "skipping malformed host input");
      None
    }
  }
}

/// A failing event is logged and the loop
/// carries on with the next one.
fn deliver(
  app: &mut App,
  event: AppEvent
) -> Flow {
  match app.handle(event) {
    | Ok(flow) => flow,
    | Err(err) => {
      error!(error = %format!("{err:#}"), "event handler failed");
      Flow::Continue
    }
  }
}

#[cfg(unix)]
pub async fn wait_for_shutdown_signal() {
  use tokio::signal::unix::{
    SignalKind,
    signal
  };

  let mut sigint = match signal(
    SignalKind::interrupt()
  ) {
    | Ok(stream) => stream,
    | Err(error) => {
      error!(
        %error,
        "failed to register SIGINT \
         handler; falling back to \
         ctrl_c"
      );
      let _ =
        tokio::signal::ctrl_c().await;
      return;
    }
  };

  let mut sigterm = match signal(
    SignalKind::terminate()
  ) {
    | Ok(stream) => stream,
    | Err(error) => {
      error!(
        %error,
        "failed to register SIGTERM \
         handler; falling back to \
         ctrl_c"
      );
      let _ =
        tokio::signal::ctrl_c().await;
      return;
    }
  };

  tokio::select! {
    _ = sigint.recv() => {}
    _ = sigterm.recv() => {}
  }
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() {
  if let Err(error) =
    tokio::signal::ctrl_c().await
  {
    error!(
      %error,
      "failed waiting for ctrl_c \
       signal"
    );
  }
}

#[cfg(test)]
mod tests {
  use std::io::{
    self,
    Write
  };
  use std::sync::Arc;

  use parking_lot::Mutex;
  use tokio::io::{
    AsyncWriteExt,
    BufReader,
    DuplexStream
  };

  use super::*;
  use crate::config::{
    Config,
    HostSettings
  };
  use crate::host::{
    HostSink,
    stdio_shell
  };
  use crate::store::Store;

  #[derive(Clone, Default)]
  struct Captured(Arc<Mutex<Vec<u8>>>);

  impl Write for Captured {
    fn write(
      &mut self,
      buf: &[u8]
    ) -> io::Result<usize> {
      self.0.lock().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(
      &mut self
    ) -> io::Result<()> {
      Ok(())
    }
  }

  impl Captured {
    fn lines_containing(
      &self,
      needle: &str
    ) -> usize {
      let bytes = self.0.lock().clone();
      String::from_utf8_lossy(&bytes)
        .lines()
        .filter(|line| line.contains(needle))
        .count()
    }
  }

  fn app_with_output() -> (App, Captured) {
    let captured = Captured::default();
    let sink =
      HostSink::new(Box::new(captured.clone()));
    let settings = HostSettings::from_config(
      &Config::defaults()
    );
    let app = App::start(
      Store::in_memory().expect("store"),
      stdio_shell(sink, &settings)
    )
    .expect("start");
    (app, captured)
  }

  async fn send(
    host: &mut DuplexStream,
    line: &str
  ) {
    host
      .write_all(format!("{line}\n").as_bytes())
      .await
      .expect("write line");
  }

  const OPTIONS: HostLoopOptions =
    HostLoopOptions {
      accent_debounce: Duration::from_millis(250)
    };

  #[tokio::test(start_paused = true)]
  async fn theme_changes_are_coalesced() {
    let (mut app, captured) =
      app_with_output();
    let (mut host, core) =
      tokio::io::duplex(4096);

    let driver = async move {
      for _ in 0..3 {
        send(&mut host, r#"{"type":"theme_changed"}"#).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
      }
      tokio::time::sleep(Duration::from_millis(400)).await;
      send(&mut host, r#"{"type":"quit"}"#).await;
      host
    };

    let (result, _host) = tokio::join!(
      run_host(
        &mut app,
        BufReader::new(core),
        OPTIONS,
        std::future::pending()
      ),
      driver
    );
    result.expect("host loop");

    assert_eq!(
      captured.lines_containing("updateAccentColor"),
      1,
      "one broadcast for a burst of theme changes"
    );
  }

  #[tokio::test(start_paused = true)]
  async fn theme_change_carries_new_accent() {
    let (mut app, captured) =
      app_with_output();
    let (mut host, core) =
      tokio::io::duplex(4096);

    let driver = async move {
      send(&mut host, r#"{"type":"theme_changed","accent":"007affff"}"#).await;
      tokio::time::sleep(Duration::from_millis(100)).await;
      send(&mut host, r#"{"type":"theme_changed","accent":"ff2d55ff"}"#).await;
      tokio::time::sleep(Duration::from_millis(400)).await;
      send(&mut host, r#"{"type":"quit"}"#).await;
      host
    };

    let (result, _host) = tokio::join!(
      run_host(
        &mut app,
        BufReader::new(core),
        OPTIONS,
        std::future::pending()
      ),
      driver
    );
    result.expect("host loop");

    assert_eq!(
      captured.lines_containing(r#""data":"ff2d55""#),
      1
    );
    assert_eq!(
      captured.lines_containing(r#""data":"007aff""#),
      0,
      "superseded colour is never broadcast"
    );
  }

  #[tokio::test]
  async fn malformed_lines_are_skipped() {
    let (mut app, captured) =
      app_with_output();
    let input = concat!(
      "not json\n",
      "\n",
      r#"{"type":"message","window":"editor","message":{"channel":"addTask","data":{"title":"milk","text":"milk"}}}"#,
      "\n"
    );

    run_host(
      &mut app,
      BufReader::new(input.as_bytes()),
      OPTIONS,
      std::future::pending()
    )
    .await
    .expect("host loop");

    assert_eq!(app.cache().tasks().len(), 1);
    assert!(captured.lines_containing(r#""title":"1""#) >= 1);
  }

  #[tokio::test]
  async fn shutdown_future_stops_the_loop() {
    let (mut app, _captured) =
      app_with_output();
    let (_host, core) =
      tokio::io::duplex(64);

    run_host(
      &mut app,
      BufReader::new(core),
      OPTIONS,
      async {}
    )
    .await
    .expect("host loop");
  }
}
