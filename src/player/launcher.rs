//! Hand media to a process outside the app: a configured external player
//! for streams and files, or the system opener for web players.

use std::io::{self, BufRead, BufReader};
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub url: String,
    pub title: String,
    /// Player executable; empty means the system opener.
    pub player: String,
    pub user_agent: String,
    pub buffer_secs: u32,
    pub hw_accel: bool,
}

/// Program and arguments for a request, without spawning anything.
pub fn command_line(req: &LaunchRequest) -> io::Result<(String, Vec<String>)> {
    let player = req.player.trim();
    if player.is_empty() {
        return system_opener(&req.url);
    }

    let player_lower = player.to_lowercase();
    let args = if player_lower.contains("mpv") {
        let cache_secs = req.buffer_secs * 2;
        let mut args = vec![
            req.url.clone(),
            format!("--title={}", req.title),
            "--cache=yes".to_string(),
            format!("--cache-secs={}", cache_secs),
            format!("--demuxer-readahead-secs={}", cache_secs),
            "--stream-lavf-o=reconnect=1".to_string(),
            format!("--user-agent={}", req.user_agent),
        ];
        if req.hw_accel {
            args.push("--hwdec=auto-safe".to_string());
        }
        args
    } else if player_lower.contains("vlc") {
        let cache_ms = req.buffer_secs * 2000;
        let mut args = vec![
            req.url.clone(),
            format!("--meta-title={}", req.title),
            format!("--network-caching={}", cache_ms),
            "--http-reconnect".to_string(),
            format!("--http-user-agent={}", req.user_agent),
        ];
        if req.hw_accel {
            args.push("--avcodec-hw=any".to_string());
        }
        args
    } else if player_lower.contains("ffplay") {
        vec![
            "-window_title".to_string(),
            req.title.clone(),
            "-user_agent".to_string(),
            req.user_agent.clone(),
            req.url.clone(),
        ]
    } else {
        // Generic player - just pass URL
        vec![req.url.clone()]
    };
    Ok((player.to_string(), args))
}

/// Only absolute web URLs reach the opener, and never through a shell.
fn system_opener(url: &str) -> io::Result<(String, Vec<String>)> {
    let url = Url::parse(url.trim())
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a web address: {}", url),
            )
        })?;
    let url = url.to_string();

    Ok(if cfg!(target_os = "windows") {
        (
            "rundll32".to_string(),
            vec!["url.dll,FileProtocolHandler".to_string(), url],
        )
    } else if cfg!(target_os = "macos") {
        ("open".to_string(), vec![url])
    } else {
        ("xdg-open".to_string(), vec![url])
    })
}

/// Spawn the process; its stderr is forwarded to the log. Returns the PID.
pub fn launch(req: &LaunchRequest) -> io::Result<u32> {
    let (program, args) = command_line(req)?;
    info!("Launching {} for '{}'", program, req.title);

    let mut cmd = Command::new(&program);
    cmd.args(&args)
        .env("USER_AGENT", &req.user_agent)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    let pid = child.id();

    if let Some(stderr) = child.stderr.take() {
        thread::spawn(move || {
            let reader = BufReader::new(stderr);
            for line in reader.lines().map_while(Result::ok) {
                if !line.trim().is_empty() {
                    debug!("[PLAYER] {}", line);
                }
            }
            let _ = child.wait();
        });
    }
    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(player: &str) -> LaunchRequest {
        LaunchRequest {
            url: "https://cdn.test/live.m3u8".to_string(),
            title: "News".to_string(),
            player: player.to_string(),
            user_agent: "UA/1".to_string(),
            buffer_secs: 5,
            hw_accel: true,
        }
    }

    #[test]
    fn test_mpv_arguments() {
        let (program, args) = command_line(&request("/usr/bin/mpv")).unwrap();
        assert_eq!(program, "/usr/bin/mpv");
        assert_eq!(args[0], "https://cdn.test/live.m3u8");
        assert!(args.contains(&"--title=News".to_string()));
        assert!(args.contains(&"--cache-secs=10".to_string()));
        assert!(args.contains(&"--hwdec=auto-safe".to_string()));
    }

    #[test]
    fn test_vlc_arguments() {
        let (_, args) = command_line(&request("vlc")).unwrap();
        assert!(args.contains(&"--network-caching=10000".to_string()));
        assert!(args.contains(&"--http-user-agent=UA/1".to_string()));
    }

    #[test]
    fn test_generic_player_gets_only_url() {
        let (program, args) = command_line(&request("celluloid")).unwrap();
        assert_eq!(program, "celluloid");
        assert_eq!(args, vec!["https://cdn.test/live.m3u8".to_string()]);
    }

    #[test]
    fn test_empty_player_uses_system_opener() {
        let (program, args) = command_line(&request("  ")).unwrap();
        assert!(!program.is_empty());
        assert_ne!(program, "cmd");
        assert_eq!(args.last().map(String::as_str), Some("https://cdn.test/live.m3u8"));
    }

    #[test]
    fn test_system_opener_passes_query_as_one_argument() {
        let mut req = request("");
        req.url = "https://www.youtube.com/watch?v=a&calc".to_string();
        let (program, args) = command_line(&req).unwrap();
        assert_ne!(program, "cmd");
        assert!(!args.iter().any(|a| a == "/C" || a == "start"));
        assert_eq!(
            args.last().map(String::as_str),
            Some("https://www.youtube.com/watch?v=a&calc")
        );
    }

    #[test]
    fn test_system_opener_refuses_non_web_urls() {
        for url in ["file:///etc/passwd", "calc.exe", "", "javascript:alert(1)"] {
            let mut req = request("");
            req.url = url.to_string();
            let err = command_line(&req).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        }
    }
}
