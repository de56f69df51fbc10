//! Embedded view driver.
//!
//! A plain value that owns the session. The runtime feeds it one [`Input`] at
//! a time and carries out the returned [`Effect`]s: outbound bridge
//! messages, render cues, and delayed inputs. Nothing here blocks or sleeps.

use tracing::{debug, error, warn};

use crate::config::GameConfig;
use crate::maze::Position;
use crate::protocol::{GameOverReport, HostMessage, InitialData, ViewMessage};
use crate::scoring::ScoreCard;
use crate::session::{Direction, Disarm, LossCause, Phase, Session, SessionEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Move(Direction),
    Pause,
    Enter,
}

impl Key {
    /// Arrow keys, WASD, `p`/space/Escape for pause, Enter to continue.
    pub fn parse(name: &str) -> Option<Self> {
        let key = match name {
            "ArrowUp" | "Up" | "w" | "W" => Key::Move(Direction::Up),
            "ArrowDown" | "Down" | "s" | "S" => Key::Move(Direction::Down),
            "ArrowLeft" | "Left" | "a" | "A" => Key::Move(Direction::Left),
            "ArrowRight" | "Right" | "d" | "D" => Key::Move(Direction::Right),
            "p" | "P" | " " | "Escape" => Key::Pause,
            "Enter" => Key::Enter,
            _ => return None,
        };
        Some(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Host(HostMessage),
    Key(Key),
    Click(Position),
    /// Once per second from the runtime.
    Tick,
    /// Delayed settle of the trap-disarm animation it was scheduled for.
    DisarmSettled(Disarm),
    Retry,
    NextGame,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Banner {
    Won { card: ScoreCard, bonus_key: bool },
    Lost { cause: LossCause, lives: u32 },
    NoLives,
    Paused,
    KeyCap,
    BonusKey,
}

/// Render-only hints. Renderers draw from session state, so a cue arriving
/// for a target that no longer exists is simply ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    Board,
    Hud,
    Banner(Banner),
    DoorCrack { at: Position, hits: u32, opacity: f32 },
    DoorOpen { at: Position },
    DoorSplit { at: Position },
    TrapDisarm { at: Position },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(ViewMessage),
    Render(Cue),
    Schedule { delay_ms: u64, input: Input },
}

#[derive(Debug, Clone)]
pub struct EmbeddedView {
    config: GameConfig,
    session: Option<Session>,
    ready_sent: u32,
}

impl EmbeddedView {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            session: None,
            ready_sent: 0,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.session.as_ref().map_or(Phase::Loading, Session::phase)
    }

    /// True once every `ready` attempt went out without a maze coming back.
    pub fn gave_up(&self) -> bool {
        self.session.is_none() && self.ready_sent >= self.config.ready_attempts
    }

    /// First `ready` handshake. Later attempts ride on [`Input::Tick`].
    pub fn start(&mut self) -> Vec<Effect> {
        self.send_ready()
    }

    fn send_ready(&mut self) -> Vec<Effect> {
        if self.ready_sent >= self.config.ready_attempts {
            return Vec::new();
        }
        self.ready_sent += 1;
        debug!(attempt = self.ready_sent, "sending ready");
        vec![Effect::Send(ViewMessage::Ready)]
    }

    /// Parses one raw bridge message. Garbage is logged and dropped.
    pub fn receive(&mut self, raw: &str) -> Vec<Effect> {
        match serde_json::from_str::<HostMessage>(raw) {
            Ok(msg) => self.handle(Input::Host(msg)),
            Err(e) => {
                error!(error = %e, "unreadable host message");
                Vec::new()
            }
        }
    }

    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Host(HostMessage::InitialData(data)) => self.on_initial(&data),
            Input::Tick => match self.session.as_mut() {
                None => self.send_ready(),
                Some(s) => {
                    let events = s.tick();
                    self.translate(events)
                }
            },
            other => {
                let Some(session) = self.session.as_mut() else {
                    debug!(?other, "input before first maze");
                    return Vec::new();
                };
                let events = match other {
                    Input::Key(Key::Move(dir)) => session.try_move(dir),
                    Input::Click(pos) => session.click(pos),
                    Input::Key(Key::Pause) => session.toggle_pause().into_iter().collect(),
                    Input::Key(Key::Enter) => match session.phase() {
                        Phase::Won => session.next_game().unwrap_or_default(),
                        Phase::Lost(_) => session.retry().unwrap_or_default(),
                        _ => Vec::new(),
                    },
                    Input::DisarmSettled(disarm) => {
                        if !session.finish_disarm(disarm) {
                            return Vec::new();
                        }
                        return vec![Effect::Render(Cue::Board)];
                    }
                    Input::Retry => session.retry().unwrap_or_else(|e| {
                        warn!(error = %e, "retry ignored");
                        Vec::new()
                    }),
                    Input::NextGame => session.next_game().unwrap_or_else(|e| {
                        warn!(error = %e, "next game ignored");
                        Vec::new()
                    }),
                    Input::Quit => session.quit().unwrap_or_else(|e| {
                        warn!(error = %e, "quit ignored");
                        Vec::new()
                    }),
                    Input::Host(_) | Input::Tick => Vec::new(),
                };
                self.translate(events)
            }
        }
    }

    fn on_initial(&mut self, data: &InitialData) -> Vec<Effect> {
        match self.session.as_mut() {
            Some(session) => match session.load(data) {
                Ok(events) => self.translate(events),
                Err(e) => {
                    error!(error = %e, "ignoring malformed initialData");
                    Vec::new()
                }
            },
            None => match Session::from_initial(self.config.clone(), data) {
                Ok(session) => {
                    self.session = Some(session);
                    self.translate(vec![SessionEvent::Loaded {
                        bonus_key: data.should_show_bonus_key,
                    }])
                }
                Err(e) => {
                    error!(error = %e, "ignoring malformed initialData");
                    Vec::new()
                }
            },
        }
    }

    fn translate(&self, events: Vec<SessionEvent>) -> Vec<Effect> {
        let mut out = Vec::new();
        for event in events {
            for effect in self.effects_for(event) {
                if matches!(effect, Effect::Render(Cue::Board | Cue::Hud)) && out.contains(&effect) {
                    continue;
                }
                out.push(effect);
            }
        }
        out
    }

    fn effects_for(&self, event: SessionEvent) -> Vec<Effect> {
        use Effect::{Render, Send};

        match event {
            SessionEvent::Loaded { bonus_key } => {
                let mut fx = vec![Render(Cue::Board), Render(Cue::Hud)];
                if bonus_key {
                    fx.push(Render(Cue::Banner(Banner::BonusKey)));
                }
                fx
            }
            SessionEvent::Moved { to } => {
                vec![Send(ViewMessage::MovePlayer { position: to }), Render(Cue::Board)]
            }
            SessionEvent::DoorUnlocked { at, .. } => vec![
                Send(ViewMessage::UnlockDoor { position: at }),
                Render(Cue::DoorOpen { at }),
                Render(Cue::Board),
                Render(Cue::Hud),
            ],
            SessionEvent::DoorCracked { at, hits, opacity } => {
                vec![Render(Cue::DoorCrack { at, hits, opacity })]
            }
            SessionEvent::DoorBroken { at } => {
                vec![Render(Cue::DoorSplit { at }), Render(Cue::Board)]
            }
            SessionEvent::TrapDisarmed { disarm, .. } => vec![
                Render(Cue::TrapDisarm { at: disarm.at }),
                Render(Cue::Board),
                Render(Cue::Hud),
                Effect::Schedule {
                    delay_ms: self.config.disarm_settle_ms,
                    input: Input::DisarmSettled(disarm),
                },
            ],
            SessionEvent::MapActivated | SessionEvent::CrystalActivated { .. } => {
                vec![Render(Cue::Board)]
            }
            SessionEvent::KeysGained { .. } => vec![Render(Cue::Hud)],
            SessionEvent::KeyCapReached => vec![Render(Cue::Banner(Banner::KeyCap))],
            SessionEvent::TimerTick { .. } => vec![Render(Cue::Hud)],
            SessionEvent::Paused { .. } => vec![Render(Cue::Banner(Banner::Paused))],
            SessionEvent::Resumed { .. } => vec![Render(Cue::Board), Render(Cue::Hud)],
            SessionEvent::Won { card, bonus_key } => {
                let report = GameOverReport {
                    won: true,
                    lives: self.lives(),
                    total_score: Some(card.total_score),
                    base_score: Some(card.base_score),
                    streak_bonus: Some(card.streak_bonus),
                    rating: Some(card.rating),
                    games_played: self.session.as_ref().map(Session::games_played),
                    win_streak: self.session.as_ref().map(Session::win_streak),
                    should_show_bonus_key: bonus_key,
                };
                vec![
                    Send(ViewMessage::GameOver(report)),
                    Render(Cue::Hud),
                    Render(Cue::Banner(Banner::Won { card, bonus_key })),
                ]
            }
            SessionEvent::Lost { cause, lives } => {
                let report = GameOverReport {
                    won: false,
                    lives,
                    games_played: self.session.as_ref().map(Session::games_played),
                    ..Default::default()
                };
                let banner = if lives == 0 {
                    Banner::NoLives
                } else {
                    Banner::Lost { cause, lives }
                };
                vec![
                    Send(ViewMessage::GameOver(report)),
                    Render(Cue::Hud),
                    Render(Cue::Banner(banner)),
                ]
            }
            SessionEvent::RetryStarted => {
                vec![Send(ViewMessage::Retry), Render(Cue::Board), Render(Cue::Hud)]
            }
            SessionEvent::NextGameRequested { lives } => vec![Send(ViewMessage::NextGame { lives })],
            SessionEvent::QuitRequested => vec![Send(ViewMessage::NewGame)],
        }
    }

    fn lives(&self) -> u32 {
        self.session.as_ref().map_or(0, Session::lives)
    }
}
