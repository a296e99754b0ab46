use std::time::{Duration, Instant};

use gaze_core::synthetic::{face_landmarks, looking_at, EyePose};
use gaze_core::{FaceLayout, Pt2, ScreenPoint};
use gaze_pipeline::{
    CalibrationState, ConfirmOutcome, FrameOutput, PointerAction, PointerConfig,
    PointerController,
};

const FRAME: Duration = Duration::from_millis(33);

struct Replay {
    controller: PointerController,
    t0: Instant,
    frame: u32,
}

impl Replay {
    fn new() -> Self {
        Self {
            controller: PointerController::new(PointerConfig::default()).unwrap(),
            t0: Instant::now(),
            frame: 0,
        }
    }

    fn step(&mut self, landmarks: Option<&[Pt2]>) -> FrameOutput {
        let now = self.t0 + FRAME * self.frame;
        self.frame += 1;
        self.controller.process_frame(landmarks, now)
    }

    /// Feed `landmarks` for `n` frames and collect the emitted actions.
    fn hold(&mut self, landmarks: &[Pt2], n: usize) -> Vec<PointerAction> {
        (0..n).filter_map(|_| self.step(Some(landmarks)).action).collect()
    }
}

fn layout() -> FaceLayout {
    FaceLayout::default()
}

fn wink_left() -> Vec<Pt2> {
    face_landmarks(&layout(), &EyePose::closed(), &EyePose::centered())
}

fn wink_right() -> Vec<Pt2> {
    face_landmarks(&layout(), &EyePose::centered(), &EyePose::closed())
}

fn open() -> Vec<Pt2> {
    looking_at(&layout(), 0.5, 0.5)
}

#[test]
fn short_wink_clicks_once() {
    let mut r = Replay::new();
    let mut actions = r.hold(&open(), 3);
    actions.extend(r.hold(&wink_left(), 4));
    actions.extend(r.hold(&open(), 3));
    assert_eq!(actions, vec![PointerAction::LeftClick]);
}

#[test]
fn single_frame_closure_is_noise() {
    let mut r = Replay::new();
    let mut actions = r.hold(&wink_right(), 1);
    actions.extend(r.hold(&open(), 3));
    assert!(actions.is_empty());
}

#[test]
fn cooldown_swallows_an_immediate_second_wink() {
    let mut r = Replay::new();
    let mut actions = r.hold(&wink_right(), 3);
    actions.extend(r.hold(&open(), 1));
    // Reopen frame clicks; the next five frames are ignored entirely.
    actions.extend(r.hold(&wink_right(), 3));
    actions.extend(r.hold(&open(), 2));
    assert_eq!(actions, vec![PointerAction::RightClick]);
}

#[test]
fn natural_blink_never_clicks() {
    let both_closed = face_landmarks(&layout(), &EyePose::closed(), &EyePose::closed());
    let mut r = Replay::new();
    let mut actions = r.hold(&both_closed, 4);
    actions.extend(r.hold(&open(), 3));
    assert!(actions.is_empty());
}

#[test]
fn held_wink_drags_and_tracks_the_open_eye() {
    let mut r = Replay::new();
    let actions = r.hold(&wink_right(), 12);
    assert_eq!(actions, vec![PointerAction::StartDragRight]);

    // Keep the right eye shut while the left eye looks right of center.
    let dragging = face_landmarks(&layout(), &EyePose::open(0.6, 0.5), &EyePose::closed());
    let out = r.step(Some(&dragging));
    assert_eq!(out.action, None);
    let gaze = out.gaze.unwrap();
    assert!((gaze.x - 0.75).abs() < 1e-9, "gaze {gaze:?}");

    let out = r.step(Some(&open()));
    assert_eq!(out.action, Some(PointerAction::StopDrag));
    assert!(!r.controller.action_state().is_dragging());
}

#[test]
fn blink_during_drag_releases() {
    let both_closed = face_landmarks(&layout(), &EyePose::closed(), &EyePose::closed());
    let mut r = Replay::new();
    assert_eq!(r.hold(&wink_left(), 12), vec![PointerAction::StartDragLeft]);
    assert_eq!(r.hold(&both_closed, 1), vec![PointerAction::StopDrag]);
    assert!(r.hold(&open(), 3).is_empty());
}

#[test]
fn calibration_flow_installs_mapping() {
    let poses = [(0.35, 0.35), (0.65, 0.35), (0.5, 0.5), (0.35, 0.65), (0.65, 0.65)];
    let mut r = Replay::new();
    assert_eq!(r.controller.start_calibration(), None);

    for (i, &(h, v)) in poses.iter().enumerate() {
        let lm = looking_at(&layout(), h, v);
        for _ in 0..10 {
            let out = r.step(Some(&lm));
            assert!(out.calibrating);
            assert_eq!(out.pointer, None);
        }
        let outcome = r.controller.confirm_calibration_point().unwrap();
        if i + 1 < poses.len() {
            assert_eq!(outcome, ConfirmOutcome::Advanced { next_point: i + 1 });
        } else {
            assert_eq!(outcome, ConfirmOutcome::Completed);
        }
    }

    let calibration = r.controller.calibration();
    assert_eq!(calibration.state(), CalibrationState::Complete);
    assert!(calibration.homography().is_some());
    assert!(!r.controller.is_calibrating());

    // The smoother restarts after calibration, so the first pointer is unfiltered.
    let out = r.step(Some(&looking_at(&layout(), 0.35, 0.35)));
    let p = out.pointer.unwrap();
    assert!((p - ScreenPoint::new(50.0, 50.0)).norm() < 1e-3, "pointer {p:?}");
}

#[test]
fn missing_face_frames_are_skipped() {
    let mut r = Replay::new();
    let first = r.step(Some(&open())).pointer.unwrap();
    let before = *r.controller.smoother_state();
    for _ in 0..5 {
        assert_eq!(r.step(None), FrameOutput::default());
    }
    assert_eq!(*r.controller.smoother_state(), before);
    let after = r.step(Some(&open())).pointer.unwrap();
    assert!((after - first).norm() < 1e-6);
}

#[test]
fn pointer_eases_toward_a_new_fixation() {
    let mut r = Replay::new();
    let start = r.step(Some(&looking_at(&layout(), 0.45, 0.5))).pointer.unwrap();
    let target_lm = looking_at(&layout(), 0.55, 0.5);
    let mut xs = Vec::new();
    for _ in 0..60 {
        xs.push(r.step(Some(&target_lm)).pointer.unwrap().x);
    }
    // Gaze 0.375 -> 0.625 of a 1920 px screen.
    assert!(xs[0] > start.x && xs[0] < 1200.0);
    assert!(xs.windows(2).all(|w| w[1] >= w[0]));
    assert!((xs[59] - 1200.0).abs() < 5.0, "final x {}", xs[59]);
}
