//! Wireless adapter query via the platform's network tooling.
//!
//! Windows reports through `netsh wlan show interfaces`, everything else
//! through NetworkManager's terse `nmcli` output.

use std::process::Stdio;

use tokio::process::Command;

use super::ProbeError;
use crate::sample::{AdapterState, AdapterStatus, SSID_NOT_AVAILABLE};

const NETSH_ARGS: [&str; 3] = ["wlan", "show", "interfaces"];

/// Reads the cached scan list; a rescan would stall the tick for seconds.
const NMCLI_ARGS: [&str; 7] = [
    "-t",
    "-f",
    "ACTIVE,SSID,SIGNAL",
    "device",
    "wifi",
    "--rescan",
    "no",
];

/// Run the platform command and parse its output.
pub async fn query_adapter() -> Result<AdapterStatus, ProbeError> {
    if cfg!(windows) {
        let stdout = run_command("netsh", &NETSH_ARGS).await?;
        Ok(parse_netsh_interfaces(&stdout))
    } else {
        let stdout = run_command("nmcli", &NMCLI_ARGS).await?;
        parse_nmcli_wifi(&stdout)
    }
}

async fn run_command(program: &str, args: &[&str]) -> Result<String, ProbeError> {
    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ProbeError::Command(format!("failed to execute {}: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProbeError::Command(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `netsh wlan show interfaces` key/value lines.
///
/// Keys are matched in English and Russian; `SSID` is not localized.
/// Missing fields keep their sentinel: unknown state, no SSID, no signal.
pub fn parse_netsh_interfaces(output: &str) -> AdapterStatus {
    let mut state = AdapterState::Unknown;
    let mut ssid = SSID_NOT_AVAILABLE.to_string();
    let mut signal = None;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "State" | "Состояние" => state = AdapterState::classify(value),
            "SSID" => ssid = value.to_string(),
            "Signal" | "Сигнал" => signal = parse_percent(value),
            _ => {}
        }
    }

    if state != AdapterState::Connected {
        ssid = SSID_NOT_AVAILABLE.to_string();
        signal = None;
    }

    AdapterStatus {
        state,
        ssid,
        signal_quality: signal,
    }
}

/// Parse `nmcli -t -f ACTIVE,SSID,SIGNAL device wifi --rescan no` output.
///
/// One line per visible network; the line marked active is the association.
pub fn parse_nmcli_wifi(output: &str) -> Result<AdapterStatus, ProbeError> {
    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (active, rest) = line
            .split_once(':')
            .ok_or_else(|| ProbeError::Parse(line.to_string()))?;
        let (ssid, signal) = rest
            .rsplit_once(':')
            .ok_or_else(|| ProbeError::Parse(line.to_string()))?;

        if active != "yes" {
            continue;
        }

        let ssid = ssid.replace("\\:", ":");
        return Ok(AdapterStatus {
            state: AdapterState::Connected,
            ssid: if ssid.is_empty() {
                SSID_NOT_AVAILABLE.to_string()
            } else {
                ssid
            },
            signal_quality: parse_percent(signal),
        });
    }

    Ok(AdapterStatus::disconnected())
}

fn parse_percent(value: &str) -> Option<u8> {
    value
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|pct| *pct <= 100)
}
