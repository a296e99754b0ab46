//! Eye-closure patterns to pointer commands.
//!
//! A single-eye closure lasting `[click_frames, drag_start_frames)` frames is
//! a click on reopening; one reaching `drag_start_frames` starts a drag that
//! ends when that eye reopens. Closing both eyes is treated as a natural blink:
//! it never clicks and always ends a drag.
//!
//! [`ActionState`] is a plain value advanced by [`ActionState::step`];
//! [`ActionStateMachine`] pairs it with its configuration for per-frame use.

use gaze_core::{Eye, EyeSelector, Real};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::ActionConfig;

/// Discrete command for the input driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointerAction {
    LeftClick,
    RightClick,
    StartDragLeft,
    StartDragRight,
    StopDrag,
}

impl PointerAction {
    fn click(eye: Eye) -> Self {
        match eye {
            Eye::Left => Self::LeftClick,
            Eye::Right => Self::RightClick,
        }
    }

    fn start_drag(eye: Eye) -> Self {
        match eye {
            Eye::Left => Self::StartDragLeft,
            Eye::Right => Self::StartDragRight,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeftClick => "LEFT_CLICK",
            Self::RightClick => "RIGHT_CLICK",
            Self::StartDragLeft => "START_DRAG_LEFT",
            Self::StartDragRight => "START_DRAG_RIGHT",
            Self::StopDrag => "STOP_DRAG",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPhase {
    #[default]
    Idle,
    Dragging,
}

/// Counters and phase of the action state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionState {
    pub phase: ActionPhase,
    /// Consecutive frames the left eye has been closed.
    pub left_closed_count: u32,
    /// Consecutive frames the right eye has been closed.
    pub right_closed_count: u32,
    /// Remaining frames during which input is ignored.
    pub cooldown: u32,
}

impl ActionState {
    pub fn is_dragging(&self) -> bool {
        self.phase == ActionPhase::Dragging
    }

    fn count(&self, eye: Eye) -> u32 {
        match eye {
            Eye::Left => self.left_closed_count,
            Eye::Right => self.right_closed_count,
        }
    }

    fn count_mut(&mut self, eye: Eye) -> &mut u32 {
        match eye {
            Eye::Left => &mut self.left_closed_count,
            Eye::Right => &mut self.right_closed_count,
        }
    }

    /// The eye held closed for the current drag, if dragging.
    pub fn held_eye(&self) -> Option<Eye> {
        if !self.is_dragging() {
            return None;
        }
        [Eye::Left, Eye::Right]
            .into_iter()
            .find(|&eye| self.count(eye) > 0)
    }

    /// Eyes to track gaze with: the open eye while dragging, otherwise both.
    pub fn tracking_eyes(&self) -> EyeSelector {
        match self.held_eye() {
            Some(held) => held.other().into(),
            None => EyeSelector::Both,
        }
    }

    /// Advance by one frame given both eyes' aspect ratios.
    pub fn step(
        self,
        left_ear: Real,
        right_ear: Real,
        config: &ActionConfig,
    ) -> (Self, Option<PointerAction>) {
        let mut next = self;

        if next.cooldown > 0 {
            next.cooldown -= 1;
            return (next, None);
        }

        let closed = |eye: Eye| match eye {
            Eye::Left => left_ear < config.ear_threshold,
            Eye::Right => right_ear < config.ear_threshold,
        };

        if closed(Eye::Left) && closed(Eye::Right) {
            next.left_closed_count = 0;
            next.right_closed_count = 0;
            if next.is_dragging() {
                next.phase = ActionPhase::Idle;
                return (next, Some(PointerAction::StopDrag));
            }
            return (next, None);
        }

        match next.phase {
            ActionPhase::Idle => {
                let mut action = None;
                for eye in [Eye::Left, Eye::Right] {
                    if closed(eye) {
                        let count = next.count_mut(eye);
                        *count = count.saturating_add(1);
                    } else {
                        if config.is_click(next.count(eye)) {
                            action = Some(PointerAction::click(eye));
                            next.cooldown = config.blink_cooldown_frames;
                        }
                        *next.count_mut(eye) = 0;
                    }
                }

                if let Some(eye) = [Eye::Left, Eye::Right]
                    .into_iter()
                    .find(|&eye| next.count(eye) >= config.drag_start_frames)
                {
                    next.phase = ActionPhase::Dragging;
                    return (next, Some(PointerAction::start_drag(eye)));
                }
                (next, action)
            }
            ActionPhase::Dragging => {
                for eye in [Eye::Left, Eye::Right] {
                    if next.count(eye) > 0 && !closed(eye) {
                        next.phase = ActionPhase::Idle;
                        *next.count_mut(eye) = 0;
                        return (next, Some(PointerAction::StopDrag));
                    }
                }
                (next, None)
            }
        }
    }
}

/// [`ActionState`] bound to its thresholds.
#[derive(Debug, Clone)]
pub struct ActionStateMachine {
    config: ActionConfig,
    state: ActionState,
}

impl ActionStateMachine {
    pub fn new(config: ActionConfig) -> Self {
        Self {
            config,
            state: ActionState::default(),
        }
    }

    pub fn state(&self) -> &ActionState {
        &self.state
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    pub fn update(&mut self, left_ear: Real, right_ear: Real) -> Option<PointerAction> {
        let (next, action) = self.state.step(left_ear, right_ear, &self.config);
        if let Some(action) = action {
            debug!(
                "{} (left closed {}, right closed {})",
                action.as_str(),
                self.state.left_closed_count,
                self.state.right_closed_count
            );
        }
        self.state = next;
        action
    }

    /// Return to a fresh idle state, ending any drag in progress.
    pub fn reset(&mut self) -> Option<PointerAction> {
        let was_dragging = self.state.is_dragging();
        self.state = ActionState::default();
        was_dragging.then_some(PointerAction::StopDrag)
    }
}
