//! Paged leaderboard and per-user rank.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{QuizError, QuizResult};
use crate::repository::UserRepository;
use crate::types::UserId;

pub const DEFAULT_PER_PAGE: u32 = 50;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub nickname: String,
    pub score: u32,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardPage {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
    pub has_prev: bool,
    pub has_next: bool,
}

pub struct Leaderboard {
    users: Arc<dyn UserRepository>,
}

impl Leaderboard {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// One page of users by descending score.
    ///
    /// Ranks here are positional: tied users get consecutive ranks, ordered
    /// by user id. Use [`Leaderboard::user_rank`] for the tie-aware rank.
    pub fn page(&self, page: u32, per_page: u32) -> QuizResult<LeaderboardPage> {
        if page < 1 {
            return Err(QuizError::Validation("Page must be at least 1".to_string()));
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(QuizError::Validation(format!(
                "Results per page must be between 1 and {}",
                MAX_PER_PAGE
            )));
        }

        let total = self.users.count_users()?;
        let offset = u64::from(page - 1) * u64::from(per_page);
        let users = self.users.users_by_score(offset, per_page)?;

        let leaderboard = users
            .into_iter()
            .enumerate()
            .map(|(i, user)| LeaderboardEntry {
                rank: offset + i as u64 + 1,
                nickname: user.nickname,
                score: user.total_score,
                user_id: user.id,
            })
            .collect();

        let total_pages = total.div_ceil(u64::from(per_page));

        Ok(LeaderboardPage {
            leaderboard,
            total,
            page,
            per_page,
            total_pages,
            has_prev: page > 1,
            has_next: u64::from(page) < total_pages,
        })
    }

    /// Tie-aware rank: one plus the number of users with a strictly higher score.
    pub fn user_rank(&self, user_id: UserId) -> QuizResult<u64> {
        let user = self
            .users
            .get_user(user_id)?
            .ok_or(QuizError::UserNotFound(user_id))?;
        Ok(self.users.count_users_above(user.total_score)? + 1)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::repository::QuestionRepository;
    use crate::store::tests::{sample_question, scored_attempt};
    use crate::store::SqliteQuizStore;
    use crate::types::AnswerOption;

    fn store_with_scores(scores: &[u32]) -> (Arc<SqliteQuizStore>, Vec<UserId>) {
        let store = Arc::new(SqliteQuizStore::in_memory().unwrap());
        store.insert_questions(&[sample_question("Q", AnswerOption::A)]).unwrap();
        let qid = store.question_ids().unwrap()[0];

        let mut ids = Vec::new();
        for (i, score) in scores.iter().enumerate() {
            let user = store.create_user(&format!("user{:03}", i)).unwrap();
            if *score > 0 {
                store.record_attempt(&scored_attempt(user.id, qid, *score)).unwrap();
            }
            ids.push(user.id);
        }
        (store, ids)
    }

    #[test]
    fn test_second_page_starts_at_rank_51() {
        let scores: Vec<u32> = (0..120).map(|i| 1000 - i * 5).collect();
        let (store, _) = store_with_scores(&scores);
        let board = Leaderboard::new(store);

        let page = board.page(2, 50).unwrap();
        assert_eq!(page.leaderboard.len(), 50);
        assert_eq!(page.leaderboard[0].rank, 51);
        assert_eq!(page.leaderboard[0].score, 1000 - 50 * 5);
        assert_eq!(page.total, 120);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_prev);
        assert!(page.has_next);

        let last = board.page(3, 50).unwrap();
        assert_eq!(last.leaderboard.len(), 20);
        assert!(!last.has_next);
    }

    #[test]
    fn test_ties_share_user_rank() {
        let (store, ids) = store_with_scores(&[30, 50, 50, 10]);
        let board = Leaderboard::new(store);

        assert_eq!(board.user_rank(ids[1]).unwrap(), 1);
        assert_eq!(board.user_rank(ids[2]).unwrap(), 1);
        assert_eq!(board.user_rank(ids[0]).unwrap(), 3);
        assert_eq!(board.user_rank(ids[3]).unwrap(), 4);

        // Positional ranks on the page stay distinct
        let page = board.page(1, 10).unwrap();
        let ranks: Vec<_> = page.leaderboard.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert_eq!(page.leaderboard[0].user_id, ids[1]);
        assert_eq!(page.leaderboard[1].user_id, ids[2]);
    }

    #[test]
    fn test_out_of_range_arguments() {
        let (store, _) = store_with_scores(&[10]);
        let board = Leaderboard::new(store);

        assert!(matches!(board.page(0, 10), Err(QuizError::Validation(_))));
        assert!(matches!(board.page(1, 0), Err(QuizError::Validation(_))));
        assert!(matches!(board.page(1, 101), Err(QuizError::Validation(_))));
        assert!(board.page(1, 100).is_ok());
        assert!(matches!(board.user_rank(999), Err(QuizError::UserNotFound(999))));
    }

    #[test]
    fn test_empty_leaderboard() {
        let (store, _) = store_with_scores(&[]);
        let page = Leaderboard::new(store).page(1, DEFAULT_PER_PAGE).unwrap();
        assert!(page.leaderboard.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_prev);
        assert!(!page.has_next);
    }
}
