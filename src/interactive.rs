//! Interactive command loop.
//!
//! ```text
//! AwaitAddress -> AwaitPassword -> ValidateCredentials -> Prompting -> ReadLoop -> Done
//!                                          |                              |
//!                                          +--------> Failed <------------+
//! ```
//!
//! `AwaitAddress` and `AwaitPassword` are only entered when the field is
//! empty. Telnet sessions stop after `AwaitAddress` and hand the terminal to
//! the Telnet backend, which negotiates its own password.
//!
//! Input is read one line at a time, and only after the previous command
//! has been executed, printed and logged.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::error::AppError;
use crate::executor::Dispatcher;
use crate::session::{ProtocolKind, Session};

/// Input line that ends the loop.
pub const COMMAND_QUIT: &str = ":q";

const PROMPT: &str = "> ";
const ADDRESS_PROMPT: &str = "Enter remote host and port [ip:port]: ";
const PASSWORD_PROMPT: &str = "Enter password: ";

/// Run the loop until `:q`, end of input, or the first error.
pub async fn run<R, W>(
    dispatcher: &Dispatcher,
    input: &mut R,
    output: &mut W,
    session: Session,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let session = fill_address(input, output, session).await?;

    if session.protocol_kind() == ProtocolKind::Telnet {
        info!("Starting telnet session with {}", session.address);
        return dispatcher
            .backends()
            .telnet
            .interactive(&mut *input, &mut *output, &session.address, &session.password)
            .await
            .map_err(AppError::from);
    }

    let session = fill_password(input, output, session).await?;
    dispatcher.check_credentials(&session).await?;
    info!("Interactive session with {} over {}", session.address, session.protocol_kind());

    write_flush(
        output,
        &format!(
            "Waiting commands for {} (or type {} to exit)\n{}",
            session.address, COMMAND_QUIT, PROMPT
        ),
    )
    .await?;

    while let Some(command) = read_line(input).await? {
        if command == COMMAND_QUIT {
            break;
        }
        if !command.is_empty() {
            dispatcher.execute(output, &session, &command).await?;
        }
        write_flush(output, PROMPT).await?;
    }

    Ok(())
}

/// Ask for the address if the session has none.
pub async fn fill_address<R, W>(input: &mut R, output: &mut W, session: Session) -> Result<Session, AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if !session.address.is_empty() {
        return Ok(session);
    }

    write_flush(output, ADDRESS_PROMPT).await?;
    let address = read_token(input).await?;
    if address.is_empty() {
        return Err(AppError::missing_address());
    }
    Ok(session.with_address(address))
}

/// Ask for the password if the session has none.
pub async fn fill_password<R, W>(input: &mut R, output: &mut W, session: Session) -> Result<Session, AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if !session.password.is_empty() {
        return Ok(session);
    }

    write_flush(output, PASSWORD_PROMPT).await?;
    let password = read_token(input).await?;
    if password.is_empty() {
        return Err(AppError::missing_password());
    }
    Ok(session.with_password(password))
}

/// One line without its terminator, or `None` at end of input.
async fn read_line<R>(input: &mut R) -> Result<Option<String>, AppError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }

    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Some(line))
}

/// First whitespace-separated word of the next line.
async fn read_token<R>(input: &mut R) -> Result<String, AppError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(input).await?.unwrap_or_default();
    Ok(line.split_whitespace().next().unwrap_or_default().to_string())
}

async fn write_flush<W>(output: &mut W, text: &str) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(text.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}
