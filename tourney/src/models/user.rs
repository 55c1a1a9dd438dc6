//! User entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ServiceError, ServiceResult};
use crate::score;

/// User ID type
pub type UserId = i64;

/// Highest level a user can reach.
pub const MAX_LEVEL: i32 = 100;

/// Largest balance accepted when a user is created or updated (2^52). Leaves
/// room below [`score::MAX_SCORE`] for levels and prize payouts.
pub const MAX_MONEY: i64 = 1 << 52;

/// Platform user.
///
/// `score` is always `level * 100 + money`; it only changes through
/// [`User::set_money`], [`User::set_level`] and friends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub money: i64,
    pub level: i32,
    score: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Rebuild a user from persisted columns. The stored score is ignored in
    /// favour of the derived one.
    pub fn from_parts(
        id: UserId,
        name: String,
        money: i64,
        level: i32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            money,
            level,
            score: score::score(level, money),
            created_at,
        }
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    /// Set the balance, failing without mutation when the resulting score
    /// is out of range.
    pub fn set_money(&mut self, money: i64) -> ServiceResult<()> {
        self.score = checked(self.level, money)?;
        self.money = money;
        Ok(())
    }

    pub fn set_level(&mut self, level: i32) -> ServiceResult<()> {
        self.score = checked(level, self.money)?;
        self.level = level;
        Ok(())
    }

    /// Credit an amount (prize payouts).
    pub fn credit(&mut self, amount: i64) -> ServiceResult<()> {
        let money = self.money.checked_add(amount).ok_or_else(balance_out_of_range)?;
        self.set_money(money)
    }

    /// Debit an amount, failing without mutation when the balance is short.
    pub fn debit(&mut self, amount: i64) -> ServiceResult<()> {
        if self.money < amount {
            return Err(ServiceError::InsufficientFunds {
                available: self.money,
                required: amount,
            });
        }
        let money = self.money.checked_sub(amount).ok_or_else(balance_out_of_range)?;
        self.set_money(money)
    }

    /// Money required to advance one level.
    pub fn level_up_cost(&self) -> i64 {
        100 + i64::from(self.level) * 50
    }
}

fn balance_out_of_range() -> ServiceError {
    ServiceError::Validation(format!(
        "user score would exceed {}",
        score::MAX_SCORE
    ))
}

fn checked(level: i32, money: i64) -> ServiceResult<i64> {
    score::checked_score(level, money).ok_or_else(balance_out_of_range)
}

fn validate_fields(name: &str, money: i64, level: i32) -> ServiceResult<()> {
    validate_name(name)?;
    validate_money(money)?;
    validate_level(level)
}

fn validate_name(name: &str) -> ServiceResult<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::Validation(
            "user name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_money(money: i64) -> ServiceResult<()> {
    if money < 0 {
        return Err(ServiceError::Validation(
            "user money cannot be negative".to_string(),
        ));
    }
    if money > MAX_MONEY {
        return Err(ServiceError::Validation(format!(
            "user money cannot exceed {MAX_MONEY}"
        )));
    }
    Ok(())
}

fn validate_level(level: i32) -> ServiceResult<()> {
    if !(0..=MAX_LEVEL).contains(&level) {
        return Err(ServiceError::Validation(format!(
            "user level must be between 0 and {MAX_LEVEL}"
        )));
    }
    Ok(())
}

/// Validated user data ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub money: i64,
    pub level: i32,
}

impl NewUser {
    pub fn score(&self) -> i64 {
        score::score(self.level, self.money)
    }
}

/// Create user request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub money: i64,
    pub level: i32,
}

impl CreateUserRequest {
    pub fn validate(self) -> ServiceResult<NewUser> {
        validate_fields(&self.name, self.money, self.level)?;
        Ok(NewUser {
            name: self.name.trim().to_string(),
            money: self.money,
            level: self.level,
        })
    }
}

/// Partial user update. Omitted fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub money: Option<i64>,
    pub level: Option<i32>,
}

impl UpdateUserRequest {
    /// Apply the update to a copy of `user`, returning it validated.
    ///
    /// Only supplied fields are validated; a balance grown past
    /// [`MAX_MONEY`] by payouts does not block a rename.
    pub fn apply_to(&self, user: &User) -> ServiceResult<User> {
        let mut updated = user.clone();
        if let Some(name) = &self.name {
            validate_name(name)?;
            updated.name = name.trim().to_string();
        }
        if let Some(money) = self.money {
            validate_money(money)?;
        }
        if let Some(level) = self.level {
            validate_level(level)?;
        }

        let money = self.money.unwrap_or(user.money);
        let level = self.level.unwrap_or(user.level);
        updated.score = checked(level, money)?;
        updated.money = money;
        updated.level = level;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(money: i64, level: i32) -> User {
        User::from_parts(1, "alice".to_string(), money, level, Utc::now())
    }

    #[test]
    fn test_score_derived_on_construction() {
        assert_eq!(user(1000, 1).score(), 1100);
    }

    #[test]
    fn test_debit_recomputes_score() {
        let mut u = user(1000, 1);
        u.debit(50).unwrap();
        assert_eq!(u.money, 950);
        assert_eq!(u.score(), 1050);
    }

    #[test]
    fn test_debit_insufficient_leaves_user_untouched() {
        let mut u = user(40, 3);
        let err = u.debit(50).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InsufficientFunds {
                available: 40,
                required: 50
            }
        ));
        assert_eq!(u.money, 40);
        assert_eq!(u.score(), 340);
    }

    #[test]
    fn test_level_up_cost() {
        assert_eq!(user(0, 0).level_up_cost(), 100);
        assert_eq!(user(0, 1).level_up_cost(), 150);
        assert_eq!(user(0, 10).level_up_cost(), 600);
    }

    #[test]
    fn test_create_request_validation() {
        let ok = CreateUserRequest {
            name: " bob ".to_string(),
            money: 10,
            level: 0,
        }
        .validate()
        .unwrap();
        assert_eq!(ok.name, "bob");
        assert_eq!(ok.score(), 10);

        for (name, money, level) in [("", 1, 1), ("x", -1, 1), ("x", 1, 101), ("x", 1, -1)] {
            let err = CreateUserRequest {
                name: name.to_string(),
                money,
                level,
            }
            .validate()
            .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
    }

    #[test]
    fn test_update_request_recomputes_score() {
        let u = user(1000, 1);
        let req = UpdateUserRequest {
            money: Some(10),
            level: Some(5),
            ..Default::default()
        };
        let updated = req.apply_to(&u).unwrap();
        assert_eq!(updated.score(), 510);
        assert_eq!(updated.name, "alice");
    }

    #[test]
    fn test_money_above_bound_is_rejected() {
        let err = CreateUserRequest {
            name: "whale".to_string(),
            money: i64::MAX,
            level: 1,
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let at_bound = CreateUserRequest {
            name: "whale".to_string(),
            money: MAX_MONEY,
            level: MAX_LEVEL,
        }
        .validate()
        .unwrap();
        assert_eq!(at_bound.score(), MAX_MONEY + 10_000);

        let req = UpdateUserRequest {
            money: Some(MAX_MONEY + 1),
            ..Default::default()
        };
        assert!(matches!(
            req.apply_to(&user(1, 1)),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_credit_past_max_score_leaves_user_untouched() {
        let mut u = user(score::MAX_SCORE - 100, 1);
        let err = u.credit(1).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(u.money, score::MAX_SCORE - 100);
        assert_eq!(u.score(), score::MAX_SCORE);

        let err = u.credit(i64::MAX).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(u.score(), score::MAX_SCORE);
    }

    #[test]
    fn test_rename_allowed_above_input_bound() {
        let rich = user(MAX_MONEY * 2, 3);
        let req = UpdateUserRequest {
            name: Some("still rich".to_string()),
            ..Default::default()
        };
        let updated = req.apply_to(&rich).unwrap();
        assert_eq!(updated.money, MAX_MONEY * 2);
        assert_eq!(updated.score(), rich.score());
    }

    #[test]
    fn test_update_request_rejects_invalid_level() {
        let req = UpdateUserRequest {
            level: Some(101),
            ..Default::default()
        };
        assert!(matches!(
            req.apply_to(&user(1, 1)),
            Err(ServiceError::Validation(_))
        ));
    }
}
