//! Headless replay: feed a recorded event log through the model thread and
//! describe what the buffers look like afterwards.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lith_model::{Buffer, BufferDirectory, BufferHandle, BufferLine, ModelEvent, SegmentKind};
use lith_relay::{ModelThread, RelayCommand, RelayEvent, decode_event_log, make_command_channel};
use snafu::{OptionExt, ResultExt};

use crate::error::{
    AppResult, DecodeEventLogSnafu, EncodeCommandSnafu, InvalidBufferArgumentSnafu,
    MissingArgumentValueSnafu, MissingEventLogSnafu, ModelThreadSnafu, ReadEventLogSnafu,
    SettingsSnafu, UnknownArgumentSnafu,
};
use crate::settings::{Settings, SettingsStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayArgs {
    pub event_log: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub write_config: bool,
    /// Buffers that get one backfill request after the log is applied.
    pub fetch_more: Vec<BufferHandle>,
}

pub fn parse_args(args: impl IntoIterator<Item = String>) -> AppResult<ReplayArgs> {
    let mut parsed = ReplayArgs::default();
    let mut pending = args.into_iter();

    while let Some(argument) = pending.next() {
        match argument.as_str() {
            "--config" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-config-value",
                    arg: "--config",
                })?;
                parsed.config_path = Some(PathBuf::from(value));
            }
            "--write-config" => parsed.write_config = true,
            "--fetch-more" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-fetch-more-value",
                    arg: "--fetch-more",
                })?;
                let handle = BufferHandle::parse(&value).context(InvalidBufferArgumentSnafu {
                    stage: "parse-args-fetch-more",
                })?;
                parsed.fetch_more.push(handle);
            }
            _ if !argument.starts_with("--") && parsed.event_log.is_none() => {
                parsed.event_log = Some(PathBuf::from(argument));
            }
            _ => {
                return UnknownArgumentSnafu {
                    stage: "parse-args",
                    raw: argument,
                }
                .fail();
            }
        }
    }

    if parsed.event_log.is_none() && !parsed.write_config {
        return MissingEventLogSnafu {
            stage: "parse-args-event-log-required",
        }
        .fail();
    }
    Ok(parsed)
}

/// Executes one invocation and returns the report to print.
///
/// Loads settings, optionally writes them back, then replays the event log if one was given.
pub fn run(args: ReplayArgs) -> AppResult<String> {
    let store = match args.config_path {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::load(),
    };
    let settings = store.settings();
    let mut report = String::new();

    if args.write_config {
        store
            .update(settings.as_ref().clone())
            .context(SettingsSnafu {
                stage: "write-config",
            })?;
        let _ = writeln!(report, "config_path={}", store.config_path().display());
    }

    let Some(event_log) = args.event_log else {
        return Ok(report);
    };
    let text = std::fs::read_to_string(&event_log).context(ReadEventLogSnafu {
        stage: "read-event-log",
        path: event_log.clone(),
    })?;
    let events = decode_event_log(&text).context(DecodeEventLogSnafu {
        stage: "decode-event-log",
        path: event_log,
    })?;
    tracing::info!(events = events.len(), "replaying event log");

    let outcome = run_replay(events, &settings, &args.fetch_more)?;
    report.push_str(&render_dump(&outcome.directory, &settings));
    for command in &outcome.commands {
        let encoded = serde_json::to_string(command).context(EncodeCommandSnafu {
            stage: "encode-relay-command",
        })?;
        let _ = writeln!(report, "command={encoded}");
    }
    tracing::info!(
        buffers = outcome.directory.len(),
        notifications = outcome.notifications,
        "replay finished"
    );
    Ok(report)
}

pub struct ReplayOutcome {
    pub directory: BufferDirectory,
    /// Commands the model emitted, in the order it emitted them.
    pub commands: Vec<RelayCommand>,
    pub notifications: usize,
}

pub fn run_replay(
    events: Vec<RelayEvent>,
    settings: &Settings,
    fetch_more: &[BufferHandle],
) -> AppResult<ReplayOutcome> {
    let (relay, mut command_rx) = make_command_channel();
    let mut directory =
        BufferDirectory::new(Arc::new(relay)).with_backfill_step(settings.backfill_step);

    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notifications);
    directory.subscribe(move |event: &ModelEvent| {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(buffer = %event.buffer(), ?event, "model notification");
    });

    let thread = ModelThread::spawn(directory).context(ModelThreadSnafu {
        stage: "replay-spawn-model-thread",
    })?;
    let sender = thread.sender();
    let total = events.len();
    for event in events {
        if !sender.send(event) {
            tracing::warn!(total, "model thread stopped before the log was fully queued");
            break;
        }
    }
    drop(sender);

    let mut directory = thread.shutdown().context(ModelThreadSnafu {
        stage: "replay-shutdown-model-thread",
    })?;

    for handle in fetch_more {
        if !directory.request_more_lines(*handle) {
            tracing::warn!(buffer = %handle, "backfill request not sent");
        }
    }

    let mut commands = Vec::new();
    while let Ok(command) = command_rx.try_recv() {
        commands.push(command);
    }

    Ok(ReplayOutcome {
        directory,
        commands,
        notifications: notifications.load(Ordering::Relaxed),
    })
}

/// Renders every buffer in directory order, newest lines first.
pub fn render_dump(directory: &BufferDirectory, settings: &Settings) -> String {
    let mut output = String::new();
    for buffer in directory.buffers() {
        render_buffer(&mut output, buffer, settings);
    }
    output
}

fn render_buffer(output: &mut String, buffer: &Buffer, settings: &Settings) {
    let _ = writeln!(
        output,
        "[{}] {} unread={} highlight={} lines={} nicks={}",
        buffer.number(),
        buffer.name(),
        buffer.unread_count(),
        buffer.highlight_count(),
        buffer.line_count(),
        buffer.roster().len(),
    );
    if !buffer.title().is_empty() {
        let _ = writeln!(output, "  title: {}", buffer.title());
    }

    let visible = buffer.visible_nick_names();
    if !visible.is_empty() {
        let _ = writeln!(output, "  nicks: {}", visible.join(" "));
    }

    for line in buffer.lines().iter().take(settings.dump_line_limit) {
        render_line(output, line, settings.show_segments);
    }
}

fn render_line(output: &mut String, line: &BufferLine, show_segments: bool) {
    let timestamp = line
        .timestamp()
        .map(|timestamp| timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let marker = if line.highlight() { "!" } else { " " };
    let _ = writeln!(
        output,
        "  {marker}{timestamp} <{}> {}",
        line.prefix(),
        line.plain_text()
    );

    if !show_segments || line.segments().iter().all(|segment| segment.kind().is_plain()) {
        return;
    }
    for segment in line.segments() {
        match segment.kind() {
            SegmentKind::Plain => {}
            SegmentKind::Embed => {
                let _ = writeln!(
                    output,
                    "      {}: {} -> {}",
                    segment.kind().label(),
                    segment.summary(),
                    segment.embed_url().unwrap_or_default()
                );
            }
            kind => {
                let _ = writeln!(output, "      {}: {}", kind.label(), segment.summary());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const LOG: &str = r##"
{"event":"buffer_opened","buffer":"0x2","number":2,"name":"irc.libera.#rust","title":"Rust talk"}
{"event":"buffer_opened","buffer":"0x1","number":1,"name":"core.weechat"}
{"event":"line","buffer":"0x2","line":"0x10","date":1700000000,"prefix":"alice","message":"see https://example.com/a.png"}
{"event":"line","buffer":"0x2","line":"0x11","date":1700000060,"prefix":"bob","message":"plain words","highlight":true}
{"event":"nick","buffer":"0x2","nick":"0x20","visible":true,"level":0,"name":"alice"}
{"event":"nick","buffer":"0x2","nick":"0x21","visible":true,"level":1,"name":"ops"}
{"event":"hotlist","buffer":"0x2","counts":[0,2,1,0]}
"##;

    fn args(raw: &[&str]) -> AppResult<ReplayArgs> {
        parse_args(raw.iter().map(|value| value.to_string()))
    }

    #[test]
    fn parses_log_and_flags() {
        let parsed = args(&["events.jsonl", "--config", "c.json", "--fetch-more", "0x2"]).unwrap();
        assert_eq!(parsed.event_log, Some(PathBuf::from("events.jsonl")));
        assert_eq!(parsed.config_path, Some(PathBuf::from("c.json")));
        assert_eq!(parsed.fetch_more, vec![BufferHandle::new(2)]);
        assert!(!parsed.write_config);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(args(&[]), Err(AppError::MissingEventLog { .. })));
        assert!(matches!(
            args(&["a.jsonl", "--config"]),
            Err(AppError::MissingArgumentValue { .. })
        ));
        assert!(matches!(
            args(&["a.jsonl", "b.jsonl"]),
            Err(AppError::UnknownArgument { .. })
        ));
        assert!(matches!(
            args(&["a.jsonl", "--fetch-more", "zz"]),
            Err(AppError::InvalidBufferArgument { .. })
        ));
        assert!(args(&["--write-config"]).is_ok());
    }

    #[test]
    fn replay_builds_the_directory_and_collects_commands() {
        let events = decode_event_log(LOG).unwrap();
        let settings = Settings {
            backfill_step: 10,
            ..Settings::default()
        };

        let outcome = run_replay(events, &settings, &[BufferHandle::new(2)]).unwrap();
        assert_eq!(outcome.directory.len(), 2);
        assert!(outcome.notifications > 0);
        assert_eq!(
            outcome.commands,
            vec![RelayCommand::FetchLines {
                buffer: BufferHandle::new(2),
                count: 12
            }]
        );
    }

    #[test]
    fn dump_lists_buffers_in_number_order_with_segments() {
        let events = decode_event_log(LOG).unwrap();
        let settings = Settings::default();
        let outcome = run_replay(events, &settings, &[]).unwrap();

        let dump = render_dump(&outcome.directory, &settings);
        let core = dump.find("[1] core.weechat").unwrap();
        let rust = dump.find("[2] irc.libera.#rust unread=2 highlight=1").unwrap();
        assert!(core < rust);
        assert!(dump.contains("  title: Rust talk"));
        assert!(dump.contains("  nicks: alice\n"));
        assert!(dump.contains("      image: https://example.com/a.png"));

        let bob = dump.find("<bob> plain words").unwrap();
        let alice = dump.find("<alice> see").unwrap();
        assert!(bob < alice);
        assert!(dump.contains("  !2023-11-14 22:14:20 <bob>"));
    }

    #[test]
    fn run_replays_a_log_file_with_file_settings() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("events.jsonl");
        std::fs::write(&log_path, LOG).unwrap();
        let config_path = dir.path().join("settings.json");
        std::fs::write(&config_path, r#"{ "backfill_step": 10 }"#).unwrap();

        let report = run(ReplayArgs {
            event_log: Some(log_path),
            config_path: Some(config_path),
            write_config: false,
            fetch_more: vec![BufferHandle::new(2)],
        })
        .unwrap();

        assert!(report.contains("[1] core.weechat"));
        assert!(report.contains("[2] irc.libera.#rust unread=2 highlight=1"));
        assert!(report.ends_with(
            "command={\"command\":\"fetch_lines\",\"buffer\":\"0x2\",\"count\":12}\n"
        ));
        assert!(!report.contains("config_path="));
    }

    #[test]
    fn run_writes_config_without_a_log() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("lith").join("settings.json");

        let report = run(ReplayArgs {
            config_path: Some(config_path.clone()),
            write_config: true,
            ..ReplayArgs::default()
        })
        .unwrap();

        assert_eq!(report, format!("config_path={}\n", config_path.display()));
        let written: Settings =
            serde_json::from_str(&std::fs::read_to_string(&config_path).unwrap()).unwrap();
        assert_eq!(written, Settings::default());
    }

    #[test]
    fn run_reports_missing_and_malformed_logs() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = Some(dir.path().join("settings.json"));

        let missing = run(ReplayArgs {
            event_log: Some(dir.path().join("absent.jsonl")),
            config_path: config_path.clone(),
            ..ReplayArgs::default()
        });
        assert!(matches!(missing, Err(AppError::ReadEventLog { .. })));

        let broken_path = dir.path().join("broken.jsonl");
        std::fs::write(&broken_path, "{\"event\":\"line\"}\n").unwrap();
        let broken = run(ReplayArgs {
            event_log: Some(broken_path),
            config_path,
            ..ReplayArgs::default()
        });
        assert!(matches!(broken, Err(AppError::DecodeEventLog { .. })));
    }

    #[test]
    fn dump_respects_line_limit_and_segment_toggle() {
        let events = decode_event_log(LOG).unwrap();
        let settings = Settings {
            dump_line_limit: 1,
            show_segments: false,
            ..Settings::default()
        };
        let outcome = run_replay(events, &settings, &[]).unwrap();

        let dump = render_dump(&outcome.directory, &settings);
        assert!(dump.contains("<bob>"));
        assert!(!dump.contains("<alice>"));
        assert!(!dump.contains("image:"));
    }
}
