use std::io::{self, BufRead, Write};
use tracing::warn;

/// Asks before the destination is emptied. Only a literal `y` answers yes;
/// anything else, including end of input, is a no.
pub fn confirm_cleanup<R: BufRead, W: Write>(
    pending: usize,
    input: &mut R,
    output: &mut W,
) -> io::Result<bool> {
    writeln!(
        output,
        "Warning: {} files in the output folder will be cleaned. Are you sure you want to continue? (y/n)",
        pending
    )?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    Ok(answer.trim() == "y")
}

/// Like [`confirm_cleanup`], but an I/O failure on the prompt is logged and
/// read as a refusal.
pub fn confirm_or_decline<R: BufRead, W: Write>(
    pending: usize,
    input: &mut R,
    output: &mut W,
) -> bool {
    confirm_cleanup(pending, input, output).unwrap_or_else(|e| {
        warn!("could not read the confirmation answer, declining: {}", e);
        false
    })
}
