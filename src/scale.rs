//! Weighing-scale command catalog: the closed set of control bytes the
//! Connection Multiplexer accepts once a connection is in weighing mode (or
//! for any first line that isn't `MODE:WEIGHT`/`MODE:PRINTER`).
//!
//! Grounded on `process_weight_line()`: every command writes a fixed byte
//! (or byte plus payload) to the scale FD; the four that expect a reply
//! (`RD_WEIGHT`, `XC_RDRAWCT`, `RD_TECHSPEC`, `RD_CUSSPEC`) wait 200 ms then
//! read one line, falling back to an error string when the scale stays
//! silent.

use std::time::Duration;

use crate::transport::Port;

const RD_WEIGHT_WAIT: Duration = Duration::from_millis(200);

/// One named scale command with the byte(s) it writes and whether it
/// expects a read-back afterward.
enum Command {
    Write(&'static [u8]),
    WriteThenRead(u8, &'static str),
    KeyCal,
}

fn lookup(cmd: &str) -> Option<Command> {
    Some(match cmd {
        "RD_WEIGHT" => Command::WriteThenRead(0x05, "Error: No response from weight machine."),
        "XC_TARE" => Command::Write(b"Tt"),
        "XC_REZERO" => Command::Write(&[0x10]),
        "XC_SON" => Command::Write(&[0x12]),
        "XC_CALZERO" => Command::Write(&[0x14]),
        "XC_CALSPAN" => Command::Write(&[0x15]),
        "XC_CALIBRATE" => Command::Write(&[0x16]),
        "XC_RDRAWCT" => Command::WriteThenRead(0x11, "Error: No raw data response."),
        "XC_LOAD_DEFAULTS" => Command::Write(&[0x17]),
        "WR_TECHSPEC" => Command::Write(&[0x18]),
        "RD_TECHSPEC" => Command::WriteThenRead(0x19, "Error: no data from scale"),
        "WR_CUSSPEC" => Command::Write(&[0x1A]),
        "RD_CUSSPEC" => Command::WriteThenRead(0x1B, "Error: no data from scale"),
        "XC_RESTART" => Command::Write(&[0x1C]),
        _ if cmd.starts_with("XC_KEYCAL") => Command::KeyCal,
        _ => return None,
    })
}

fn ack_for(cmd: &str) -> &'static str {
    match cmd {
        "XC_TARE" => "XC_TARE: Tare command sent.",
        "XC_REZERO" => "XC_REZERO sent.",
        "XC_SON" => "XC_SON: Calibration start.",
        "XC_CALZERO" => "XC_CALZERO: Zero point set.",
        "XC_CALSPAN" => "XC_CALSPAN: Span set.",
        "XC_CALIBRATE" => "XC_CALIBRATE: Calibration finalize.",
        "XC_LOAD_DEFAULTS" => "XC_LOAD_DEFAULTS sent.",
        "WR_TECHSPEC" => "WR_TECHSPEC sent.",
        "WR_CUSSPEC" => "WR_CUSSPEC sent.",
        "XC_RESTART" => "XC_RESTART sent.",
        _ if cmd.starts_with("XC_KEYCAL") => "XC_KEYCAL sent with weight payload.",
        _ => "",
    }
}

/// Run one weighing command line against `scale`. `scale` is `None` when
/// the device failed to open at startup — every command then reports the
/// "no response" style error rather than panicking on a missing FD.
pub async fn run(scale: Option<&dyn Port>, cmd: &str) -> String {
    let cmd = cmd.trim();
    let Some(command) = lookup(cmd) else {
        return "Error: Unknown command".to_string();
    };

    let Some(port) = scale else {
        return match &command {
            Command::WriteThenRead(_, fallback) => fallback.to_string(),
            _ => "Error: No response from weight machine.".to_string(),
        };
    };

    match command {
        Command::Write(bytes) => {
            let _ = port.write_all(bytes).await;
            ack_for(cmd).to_string()
        }
        Command::KeyCal => {
            let mut payload = vec![0x13u8];
            payload.extend_from_slice(cmd["XC_KEYCAL".len()..].as_bytes());
            let _ = port.write_all(&payload).await;
            ack_for(cmd).to_string()
        }
        Command::WriteThenRead(byte, fallback) => {
            let _ = port.write_all(&[byte]).await;
            tokio::time::sleep(RD_WEIGHT_WAIT).await;
            match port.read_line(300).await {
                Ok(Some(line)) if !line.is_empty() => line,
                _ => fallback.to_string(),
            }
        }
    }
}
