//! A line-oriented front-end for the panel.
//!
//! Each line read from the input is one user action: picking an output,
//! moving the slider, pressing apply. The panel is printed after every
//! action.

use crate::{
    armaf::{spawn_server, ActorPort, ActorRequestError},
    control::panel::{PanelController, PanelIntent, PanelState, Phase},
    external::display::DisplayBackend,
};
use anyhow::{Context, Result};
use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::watch,
};

const HELP: &str = "\
Commands:
  outputs          list available outputs
  select <output>  choose the output to control
  set <value>      move the brightness slider (0.1 - 1.0)
  + / -            nudge the slider up or down
  apply            send the current brightness again
  status           show the panel
  help             show this help
  quit             leave";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Outputs,
    Select(String),
    Set(f64),
    Up,
    Down,
    Apply,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command {0:?}, try help")]
    Unknown(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("{0:?} is not a number")]
    NotANumber(String),
}

/// Parse a line of input. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let verb = match words.next() {
        Some(verb) => verb,
        None => return Ok(None),
    };
    let command = match verb {
        "outputs" | "ls" => Command::Outputs,
        "select" | "output" => Command::Select(
            words
                .next()
                .ok_or(CommandError::MissingArgument("select"))?
                .to_owned(),
        ),
        "set" | "brightness" => {
            let raw = words.next().ok_or(CommandError::MissingArgument("set"))?;
            Command::Set(
                raw.parse()
                    .map_err(|_| CommandError::NotANumber(raw.to_owned()))?,
            )
        }
        "+" | "up" => Command::Up,
        "-" | "down" => Command::Down,
        "apply" => Command::Apply,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_owned())),
    };
    Ok(Some(command))
}

/// Render the whole panel
pub fn render(state: &PanelState) -> String {
    if state.phase == Phase::Initializing {
        return "initializing...".to_owned();
    }
    let output = state.selected.as_deref().unwrap_or("none");
    let brightness = state
        .brightness
        .map(|b| b.to_string())
        .unwrap_or_else(|| "-".to_owned());
    let control = if state.control_enabled() {
        "enabled"
    } else {
        "disabled"
    };
    format!(
        "output: {}  brightness: {}  control: {}",
        output, brightness, control
    )
}

/// Render the output selector, marking the selected output.
pub fn render_outputs(state: &PanelState) -> String {
    if state.outputs.is_empty() {
        return "no outputs available".to_owned();
    }
    state
        .outputs
        .iter()
        .map(|output| {
            let marker = if state.selected.as_ref() == Some(output) {
                '*'
            } else {
                ' '
            };
            format!("{} {}", marker, output)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the panel until the input ends or the user quits.
///
/// `nudge_step` is how far `+` and `-` move the slider.
pub async fn run<B, I, O>(
    controller: PanelController<B>,
    state: watch::Receiver<PanelState>,
    nudge_step: f64,
    mut input: I,
    mut output: O,
) -> Result<()>
where
    B: DisplayBackend,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let initializing = render(&state.borrow());
    write_line(&mut output, &initializing).await?;
    let port = spawn_server(controller).await?;
    let ready = render(&state.borrow());
    write_line(&mut output, &ready).await?;

    let mut line = String::new();
    loop {
        line.clear();
        if input
            .read_line(&mut line)
            .await
            .context("Couldn't read command")?
            == 0
        {
            break;
        }
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                write_line(&mut output, &format!("error: {}", e)).await?;
                continue;
            }
        };
        let reply = match command {
            Command::Quit => break,
            Command::Help => HELP.to_owned(),
            Command::Status => render(&state.borrow()),
            Command::Outputs => render_outputs(&state.borrow()),
            Command::Select(name) => request(&port, PanelIntent::SelectOutput(name)).await,
            Command::Set(value) => request(&port, PanelIntent::SetBrightness(value)).await,
            Command::Up => request(&port, PanelIntent::Nudge(nudge_step)).await,
            Command::Down => request(&port, PanelIntent::Nudge(-nudge_step)).await,
            Command::Apply => request(&port, PanelIntent::Apply).await,
        };
        write_line(&mut output, &reply).await?;
    }
    port.await_shutdown().await;
    Ok(())
}

async fn request(
    port: &ActorPort<PanelIntent, PanelState, anyhow::Error>,
    intent: PanelIntent,
) -> String {
    match port.request(intent).await {
        Ok(state) => render(&state),
        Err(ActorRequestError::Actor(e)) => format!("error: {:#}", e),
        Err(e) => format!("error: {}", e),
    }
}

async fn write_line(output: &mut (impl AsyncWrite + Unpin), line: &str) -> Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::external::display::{mock::MockDisplayBackend, Brightness};

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("   \n"), Ok(None));
        assert_eq!(parse_command("outputs"), Ok(Some(Command::Outputs)));
        assert_eq!(
            parse_command("select HDMI-1\n"),
            Ok(Some(Command::Select("HDMI-1".to_owned())))
        );
        assert_eq!(parse_command("set 0.5"), Ok(Some(Command::Set(0.5))));
        assert_eq!(parse_command("+"), Ok(Some(Command::Up)));
        assert_eq!(parse_command("down"), Ok(Some(Command::Down)));
        assert_eq!(parse_command("apply"), Ok(Some(Command::Apply)));
        assert_eq!(parse_command("exit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_command("select"),
            Err(CommandError::MissingArgument("select"))
        );
        assert_eq!(
            parse_command("set half"),
            Err(CommandError::NotANumber("half".to_owned()))
        );
        assert_eq!(
            parse_command("dim"),
            Err(CommandError::Unknown("dim".to_owned()))
        );
    }

    #[test]
    fn test_render() {
        let mut state = PanelState::initializing();
        assert_eq!(render(&state), "initializing...");
        state.finish_initialization(
            vec!["HDMI-1".to_owned(), "eDP-1".to_owned()],
            Some(Brightness::new(0.8).unwrap()),
        );
        assert_eq!(
            render(&state),
            "output: HDMI-1  brightness: 0.80  control: enabled"
        );
        assert_eq!(render_outputs(&state), "* HDMI-1\n  eDP-1");

        let mut empty = PanelState::initializing();
        empty.finish_initialization(vec![], None);
        assert_eq!(
            render(&empty),
            "output: none  brightness: -  control: disabled"
        );
        assert_eq!(render_outputs(&empty), "no outputs available");
    }

    #[tokio::test(start_paused = true)]
    async fn test_session() {
        let backend =
            MockDisplayBackend::new(&["HDMI-1", "eDP-1"], Brightness::new(0.8).unwrap());
        let mut calls = backend.subscribe_set_calls();
        let (controller, state) = PanelController::new(backend.clone(), Brightness::DEFAULT);
        let input: &[u8] = b"status\nset 0.5\nbogus\nselect eDP-1\n-\nquit\nset 0.2\n";
        let mut output = Vec::new();
        run(controller, state, 0.05, input, &mut output)
            .await
            .expect("Console session failed");
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let transcript = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = transcript.lines().collect();
        assert_eq!(
            lines,
            vec![
                "initializing...",
                "output: HDMI-1  brightness: 0.80  control: enabled",
                "output: HDMI-1  brightness: 0.80  control: enabled",
                "output: HDMI-1  brightness: 0.50  control: enabled",
                "error: unknown command \"bogus\", try help",
                "output: eDP-1  brightness: 0.50  control: enabled",
                "output: eDP-1  brightness: 0.45  control: enabled",
            ]
        );

        let mut received = vec![];
        while let Ok(call) = calls.try_recv() {
            received.push(call);
        }
        assert_eq!(
            received.last(),
            Some(&("eDP-1".to_owned(), Brightness::new(0.45).unwrap()))
        );
        assert!(received
            .iter()
            .all(|(_, value)| *value != Brightness::new(0.2).unwrap()));
    }
}
