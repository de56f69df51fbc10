use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::scoring::ScoreCard;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelRecord {
    pub best_score: u32,
    pub best_rating: f32,
    pub plays: u32,
}

/// Cross-maze aggregate for one embedded view. Lives as long as the view; the
/// core never writes it anywhere durable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub total_score: u32,
    pub games_played: u32,
    pub wins: u32,
    pub total_stars: f32,
    pub win_streak: u32,
    pub highest_streak: u32,
    pub average_rating: f32,
    pub current_keys: u32,
    pub current_lives: u32,
    pub levels: HashMap<u32, LevelRecord>,
}

impl PlayerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_win(&mut self, level: u32, card: &ScoreCard) {
        self.games_played += 1;
        self.wins += 1;
        self.total_score = self.total_score.saturating_add(card.total_score);
        self.total_stars += card.rating;
        self.win_streak += 1;
        self.highest_streak = self.highest_streak.max(self.win_streak);
        self.average_rating = self.total_stars / self.wins as f32;

        let record = self.levels.entry(level).or_default();
        record.plays += 1;
        record.best_score = record.best_score.max(card.total_score);
        record.best_rating = record.best_rating.max(card.rating);
    }

    pub fn record_loss(&mut self, level: u32) {
        self.games_played += 1;
        self.win_streak = 0;
        self.levels.entry(level).or_default().plays += 1;
    }

    pub fn sync_resources(&mut self, keys: u32, lives: u32) {
        self.current_keys = keys;
        self.current_lives = lives;
    }

    pub fn level(&self, level: u32) -> Option<&LevelRecord> {
        self.levels.get(&level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(total: u32, rating: f32) -> ScoreCard {
        ScoreCard {
            base_score: total,
            streak_bonus: 0,
            total_score: total,
            rating,
        }
    }

    #[test]
    fn wins_accumulate_and_track_bests() {
        let mut s = PlayerStats::new();
        s.record_win(1, &card(1500, 4.5));
        s.record_win(1, &card(1200, 3.5));
        assert_eq!(s.total_score, 2700);
        assert_eq!(s.win_streak, 2);
        assert_eq!(s.highest_streak, 2);
        assert_eq!(s.average_rating, 4.0);

        let lvl = s.level(1).unwrap();
        assert_eq!(lvl.best_score, 1500);
        assert_eq!(lvl.best_rating, 4.5);
        assert_eq!(lvl.plays, 2);
    }

    #[test]
    fn loss_breaks_streak_but_keeps_highest() {
        let mut s = PlayerStats::new();
        s.record_win(1, &card(1000, 3.0));
        s.record_win(1, &card(1000, 3.0));
        s.record_loss(2);
        assert_eq!(s.win_streak, 0);
        assert_eq!(s.highest_streak, 2);
        assert_eq!(s.games_played, 3);
        assert_eq!(s.level(2).unwrap().plays, 1);
        assert!(s.level(3).is_none());
    }
}
