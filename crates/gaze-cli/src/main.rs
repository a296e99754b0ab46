use std::{
    fs,
    path::Path,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;
use gaze_core::{Pt2, ScreenPoint};
use gaze_pipeline::{
    CalibrationReport, ConfirmOutcome, PointerAction, PointerConfig, PointerController,
    PointerSink,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Replay a recorded landmark trace through the gaze pointer pipeline.
#[derive(Debug, Parser)]
#[command(author, version, about = "Gaze pointer trace replay")]
struct Args {
    /// Path to JSON trace: `{ "frames": [ { "t", "landmarks", "confirm", "start_calibration" } ] }`.
    #[arg(long)]
    trace: String,

    /// Optional path to JSON PointerConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<String>,
}

/// One recorded camera frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct TraceFrame {
    /// Seconds since the start of the recording.
    t: f64,
    /// Face landmarks in image-normalized coordinates; `null` when no face was found.
    landmarks: Option<Vec<Pt2>>,
    /// Restart calibration before this frame.
    start_calibration: bool,
    /// Confirm the current calibration target after this frame.
    confirm: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Trace {
    frames: Vec<TraceFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FrameRecord {
    t: f64,
    pointer: Option<ScreenPoint>,
    actions: Vec<PointerAction>,
    calibrating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    calibration_event: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReplayReport {
    frames: Vec<FrameRecord>,
    calibration: Option<CalibrationReport>,
}

/// Collects what the controller sends to the output driver for one frame.
#[derive(Debug, Default)]
struct RecordingSink {
    pointer: Option<ScreenPoint>,
    actions: Vec<PointerAction>,
}

impl RecordingSink {
    fn take(&mut self) -> (Option<ScreenPoint>, Vec<PointerAction>) {
        (self.pointer.take(), std::mem::take(&mut self.actions))
    }
}

impl PointerSink for RecordingSink {
    fn move_to(&mut self, position: ScreenPoint) {
        self.pointer = Some(position);
    }

    fn perform(&mut self, action: PointerAction) {
        self.actions.push(action);
    }
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

fn replay(trace: &Trace, config: PointerConfig) -> Result<ReplayReport> {
    let mut controller = PointerController::new(config)?;
    let mut sink = RecordingSink::default();
    let base = Instant::now();
    let mut frames = Vec::with_capacity(trace.frames.len());

    for (i, frame) in trace.frames.iter().enumerate() {
        let offset = Duration::try_from_secs_f64(frame.t.max(0.0))
            .with_context(|| format!("frame {i}: invalid timestamp {}", frame.t))?;

        if frame.start_calibration {
            if let Some(stop) = controller.start_calibration() {
                sink.perform(stop);
            }
        }

        let out = controller.drive(frame.landmarks.as_deref(), base + offset, &mut sink);

        let calibration_event = frame.confirm.then(|| {
            match controller.confirm_calibration_point() {
                Ok(ConfirmOutcome::Advanced { next_point }) => {
                    format!("advanced to point {next_point}")
                }
                Ok(ConfirmOutcome::Completed) => "completed".to_string(),
                Err(e) => {
                    warn!("frame {i}: {e}");
                    e.to_string()
                }
            }
        });

        let (pointer, actions) = sink.take();
        frames.push(FrameRecord {
            t: frame.t,
            pointer,
            actions,
            calibrating: out.calibrating,
            calibration_event,
        });
    }

    info!("replayed {} frames", frames.len());
    Ok(ReplayReport {
        frames,
        calibration: controller.calibration().report().cloned(),
    })
}

fn replay_from_files(trace_path: &str, config_path: Option<&str>) -> Result<String> {
    let trace: Trace = load_json_file(Path::new(trace_path))?;
    let config = match config_path {
        Some(path) => PointerConfig::from_json_file(path)?,
        None => PointerConfig::default(),
    };
    let report = replay(&trace, config)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let json = replay_from_files(&args.trace, args.config.as_deref())?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaze_core::synthetic::{face_landmarks, looking_at, EyePose};
    use gaze_core::FaceLayout;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DT: f64 = 1.0 / 30.0;

    fn write_json<T: Serialize>(value: &T, path: &Path) {
        serde_json::to_writer_pretty(fs::File::create(path).unwrap(), value).unwrap();
    }

    fn frame(t: f64, landmarks: Option<Vec<Pt2>>) -> TraceFrame {
        TraceFrame {
            t,
            landmarks,
            ..TraceFrame::default()
        }
    }

    /// Open-eyed look, a short left wink, then a full calibration dwell sequence.
    fn synthetic_trace() -> Trace {
        let layout = FaceLayout::default();
        let mut frames = Vec::new();
        let mut push = |lm: Option<Vec<Pt2>>| {
            let t = frames.len() as f64 * DT;
            frames.push(frame(t, lm));
            frames.len() - 1
        };

        push(Some(looking_at(&layout, 0.5, 0.5)));
        for _ in 0..3 {
            push(Some(face_landmarks(&layout, &EyePose::closed(), &EyePose::centered())));
        }
        push(Some(looking_at(&layout, 0.5, 0.5)));
        push(None);

        let poses = [(0.35, 0.35), (0.65, 0.35), (0.5, 0.5), (0.35, 0.65), (0.65, 0.65)];
        let mut starts = Vec::new();
        let mut confirms = Vec::new();
        for &(h, v) in &poses {
            let lm = looking_at(&layout, h, v);
            starts.push(push(Some(lm.clone())));
            for _ in 0..4 {
                push(Some(lm.clone()));
            }
            confirms.push(push(Some(lm)));
        }
        push(Some(looking_at(&layout, 0.35, 0.35)));

        frames[starts[0]].start_calibration = true;
        for i in confirms {
            frames[i].confirm = true;
        }
        Trace { frames }
    }

    #[test]
    fn replay_reports_clicks_and_calibration() {
        let trace = synthetic_trace();
        let report = replay(&trace, PointerConfig::default()).unwrap();
        assert_eq!(report.frames.len(), trace.frames.len());

        let actions: Vec<PointerAction> = report
            .frames
            .iter()
            .flat_map(|f| f.actions.iter().copied())
            .collect();
        assert_eq!(actions, vec![PointerAction::LeftClick]);
        assert_eq!(report.frames[4].actions, vec![PointerAction::LeftClick]);

        assert_eq!(report.frames[5].pointer, None);
        assert!(!report.frames[5].calibrating);

        let events: Vec<&str> = report
            .frames
            .iter()
            .filter_map(|f| f.calibration_event.as_deref())
            .collect();
        assert_eq!(events.len(), 5);
        assert_eq!(events[4], "completed");

        let calibration = report.calibration.as_ref().unwrap();
        assert_eq!(calibration.correspondences.len(), 5);
        let last = report.frames.last().unwrap().pointer.unwrap();
        assert!((last - ScreenPoint::new(50.0, 50.0)).norm() < 1e-3, "{last:?}");
    }

    #[test]
    fn empty_confirm_is_reported_not_fatal() {
        let layout = FaceLayout::default();
        let mut start = frame(0.0, None);
        start.start_calibration = true;
        start.confirm = true;
        let trace = Trace {
            frames: vec![start, frame(DT, Some(looking_at(&layout, 0.5, 0.5)))],
        };
        let report = replay(&trace, PointerConfig::default()).unwrap();
        let event = report.frames[0].calibration_event.as_deref().unwrap();
        assert!(event.contains("no gaze samples"), "{event}");
        assert!(report.frames[1].calibrating);
        assert!(report.calibration.is_none());
    }

    #[test]
    fn calibration_start_ends_drag_in_report() {
        let layout = FaceLayout::default();
        let hold = face_landmarks(&layout, &EyePose::closed(), &EyePose::centered());
        let mut frames: Vec<TraceFrame> = (0..12)
            .map(|k| frame(k as f64 * DT, Some(hold.clone())))
            .collect();
        let mut restart = frame(12.0 * DT, Some(hold));
        restart.start_calibration = true;
        frames.push(restart);

        let report = replay(&Trace { frames }, PointerConfig::default()).unwrap();
        assert_eq!(report.frames[11].actions, vec![PointerAction::StartDragLeft]);
        assert_eq!(report.frames[12].actions, vec![PointerAction::StopDrag]);
        assert!(report.frames[12].calibrating);
    }

    #[test]
    fn helper_smoke_test() {
        let trace_file = NamedTempFile::new().unwrap();
        write_json(&synthetic_trace(), trace_file.path());

        let mut config_file = NamedTempFile::new().unwrap();
        write!(
            config_file,
            r#"{{ "screen": {{ "width": 1280, "height": 720 }}, "calibration": {{ "margin": 40 }} }}"#
        )
        .unwrap();

        let json = replay_from_files(
            trace_file.path().to_str().unwrap(),
            Some(config_file.path().to_str().unwrap()),
        )
        .expect("replay helper should succeed");

        let report: ReplayReport = serde_json::from_str(&json).unwrap();
        let last = report.frames.last().unwrap().pointer.unwrap();
        assert!((last - ScreenPoint::new(40.0, 40.0)).norm() < 1e-3, "{last:?}");
        assert!(report.calibration.is_some());
    }

    #[test]
    fn invalid_config_file_is_an_error() {
        let trace_file = NamedTempFile::new().unwrap();
        write_json(&Trace::default(), trace_file.path());
        let mut config_file = NamedTempFile::new().unwrap();
        write!(config_file, r#"{{ "actions": {{ "click_frames": 0 }} }}"#).unwrap();

        let err = replay_from_files(
            trace_file.path().to_str().unwrap(),
            Some(config_file.path().to_str().unwrap()),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("click_frames"));
    }

    #[test]
    fn missing_trace_names_the_file() {
        let err = replay_from_files("/nonexistent/trace.json", None).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/trace.json"));
    }
}
