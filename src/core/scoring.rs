//! Run scoring: base score, streak bonus and a half-star rating.
//!
//! Every input is a plain count, so the same run always scores the same.

use serde::{Deserialize, Serialize};

use crate::maze::Position;

/// Slack added to the Manhattan estimate of the shortest route.
pub const OPTIMAL_SLACK: u32 = 2;

const BASE_SCORE: f64 = 1000.0;
const RETRY_DECAY: f64 = 0.75;

// (max seconds spent, bonus); first match wins.
const TIME_BONUS: [(u32, f64); 4] = [(10, 500.0), (15, 300.0), (20, 200.0), (25, 100.0)];

// (max moves/optimal ratio, multiplier); first match wins, else 0.5.
const EFFICIENCY: [(f64, f64); 4] = [(1.1, 1.5), (1.25, 1.25), (1.5, 1.0), (2.0, 0.75)];
const EFFICIENCY_FLOOR: f64 = 0.5;

// (min current streak, multiplier); checked from the top down.
const STREAK_TIERS: [(u32, f64); 4] = [(20, 2.0), (10, 1.5), (5, 1.2), (2, 1.1)];

const RATING_TIME: [(u32, u32); 3] = [(17, 50), (22, 40), (26, 30)];
const RATING_TIME_FLOOR: u32 = 20;
const RATING_EFFICIENCY: [(f64, u32); 4] = [(1.6, 50), (1.85, 40), (2.1, 30), (2.6, 20)];
const RATING_EFFICIENCY_FLOOR: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMetrics {
    /// Seconds spent on the maze before reaching the exit.
    pub elapsed_secs: u32,
    pub moves_used: u32,
    pub optimal_moves: u32,
    pub retry_count: u32,
    /// Wins in a row before this one.
    pub win_streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCard {
    pub base_score: u32,
    pub streak_bonus: u32,
    pub total_score: u32,
    /// 1.0 ..= 5.0 in half-star steps.
    pub rating: f32,
}

/// Manhattan distance plus a fixed slack. Deliberately not the BFS distance:
/// the score tables are calibrated against this estimate.
pub fn optimal_moves(start: Position, exit: Position) -> u32 {
    start.manhattan(exit) + OPTIMAL_SLACK
}

pub fn score(m: RunMetrics) -> ScoreCard {
    let ratio = efficiency_ratio(m.moves_used, m.optimal_moves);

    let time_bonus = TIME_BONUS
        .iter()
        .find(|(max, _)| m.elapsed_secs <= *max)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0.0);
    let efficiency = EFFICIENCY
        .iter()
        .find(|(max, _)| ratio <= *max)
        .map(|(_, mult)| *mult)
        .unwrap_or(EFFICIENCY_FLOOR);
    let decay = RETRY_DECAY.powi(m.retry_count.min(i32::MAX as u32) as i32);
    let base_score = ((BASE_SCORE + time_bonus) * efficiency * decay).round() as u32;

    let streak_bonus = streak_bonus(base_score, m.win_streak);

    ScoreCard {
        base_score,
        streak_bonus,
        total_score: base_score + streak_bonus,
        rating: rating(m.elapsed_secs, ratio, m.retry_count),
    }
}

/// Multiplier for the streak this win extends (`win_streak + 1`).
pub fn streak_multiplier(win_streak: u32) -> f64 {
    let current = win_streak.saturating_add(1);
    STREAK_TIERS
        .iter()
        .find(|(min, _)| current >= *min)
        .map(|(_, mult)| *mult)
        .unwrap_or(1.0)
}

pub fn streak_bonus(base_score: u32, win_streak: u32) -> u32 {
    (base_score as f64 * (streak_multiplier(win_streak) - 1.0)).round() as u32
}

pub fn rating(elapsed_secs: u32, ratio: f64, retry_count: u32) -> f32 {
    let time_points = RATING_TIME
        .iter()
        .find(|(max, _)| elapsed_secs <= *max)
        .map(|(_, pts)| *pts)
        .unwrap_or(RATING_TIME_FLOOR);
    let efficiency_points = RATING_EFFICIENCY
        .iter()
        .find(|(max, _)| ratio <= *max)
        .map(|(_, pts)| *pts)
        .unwrap_or(RATING_EFFICIENCY_FLOOR);
    let penalty = retry_count.saturating_mul(10).min(20);

    let points = (time_points + efficiency_points).saturating_sub(penalty);
    let stars = (points as f64 / 10.0).round() / 2.0;
    stars.max(1.0) as f32
}

fn efficiency_ratio(moves_used: u32, optimal_moves: u32) -> f64 {
    moves_used as f64 / optimal_moves.max(1) as f64
}
