use std::io::Write;

const PROMPT: &str = "watermark> ";

/// Read one line from stdin. End of input reads as `exit`.
pub fn readline() -> Result<String, String> {
    write!(std::io::stdout(), "{PROMPT}").map_err(|e| e.to_string())?;
    std::io::stdout().flush().map_err(|e| e.to_string())?;

    let mut buffer = String::new();
    let read = std::io::stdin()
        .read_line(&mut buffer)
        .map_err(|e| e.to_string())?;
    if read == 0 {
        return Ok("exit".to_string());
    }
    Ok(buffer)
}
