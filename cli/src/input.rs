//! Prompt input: stdin lines and Ctrl-C.
//!
//! Ctrl-C is captured once for the whole process and forwarded as a
//! channel message, so it means the same thing whether or not a reply is
//! streaming: cancel the reply if there is one, otherwise leave.

use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One thing the user did at the prompt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// A line of text (without the newline)
    Line(String),
    /// Ctrl-C
    Interrupt,
    /// Stdin reached end of file
    Closed,
}

/// What a Ctrl-C did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterruptAction {
    /// A reply was streaming and has been cancelled
    CancelledTurn,
    /// Nothing was running; the client should exit
    Exit,
}

/// Forward every Ctrl-C for the life of the process
///
/// The listener task ends when the receiver is dropped.
pub fn listen_for_interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
        tracing::debug!("Interrupt listener stopped");
    });
    rx
}

/// Wait for the next line or interrupt
///
/// A pending interrupt wins over a pending line.
///
/// # Errors
///
/// Returns an error if reading stdin fails.
pub async fn next_input<R>(
    lines: &mut Lines<R>,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> std::io::Result<Input>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        biased;
        Some(()) = interrupts.recv() => Ok(Input::Interrupt),
        line = lines.next_line() => Ok(line?.map_or(Input::Closed, Input::Line)),
    }
}

/// Handle a Ctrl-C given the turn in progress, if any
pub fn on_interrupt(turn: Option<&CancellationToken>) -> InterruptAction {
    match turn {
        Some(cancel) => {
            tracing::info!("Cancelling reply");
            cancel.cancel();
            InterruptAction::CancelledTurn
        }
        None => InterruptAction::Exit,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncBufReadExt;

    use super::*;

    #[test]
    fn test_interrupt_while_idle_exits() {
        assert_eq!(on_interrupt(None), InterruptAction::Exit);
    }

    #[test]
    fn test_interrupt_during_turn_cancels_it() {
        let cancel = CancellationToken::new();
        assert_eq!(on_interrupt(Some(&cancel)), InterruptAction::CancelledTurn);
        assert!(cancel.is_cancelled());

        // A second Ctrl-C in the same turn is still only a cancel
        assert_eq!(on_interrupt(Some(&cancel)), InterruptAction::CancelledTurn);
    }

    #[tokio::test]
    async fn test_interrupt_wins_over_pending_line() {
        let mut lines = "hello\n".as_bytes().lines();
        let (tx, mut interrupts) = mpsc::unbounded_channel();
        tx.send(()).unwrap();

        assert_eq!(
            next_input(&mut lines, &mut interrupts).await.unwrap(),
            Input::Interrupt
        );
        assert_eq!(
            next_input(&mut lines, &mut interrupts).await.unwrap(),
            Input::Line("hello".to_string())
        );
        assert_eq!(
            next_input(&mut lines, &mut interrupts).await.unwrap(),
            Input::Closed
        );
    }

    #[tokio::test]
    async fn test_interrupts_keep_arriving_after_the_first() {
        let mut lines = "".as_bytes().lines();
        let (tx, mut interrupts) = mpsc::unbounded_channel();

        for _ in 0..3 {
            tx.send(()).unwrap();
            assert_eq!(
                next_input(&mut lines, &mut interrupts).await.unwrap(),
                Input::Interrupt
            );
        }
    }

    #[tokio::test]
    async fn test_stopped_listener_falls_back_to_stdin() {
        let mut lines = "bye\n".as_bytes().lines();
        let (tx, mut interrupts) = mpsc::unbounded_channel::<()>();
        drop(tx);

        assert_eq!(
            next_input(&mut lines, &mut interrupts).await.unwrap(),
            Input::Line("bye".to_string())
        );
    }
}
