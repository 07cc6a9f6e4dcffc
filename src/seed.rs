use std::env;

use crate::{
    error::AppResult,
    hashing::PasswordHasher,
    models::{NewUser, normalize_email},
    repository::Repository,
};

/// Account
///
/// Credentials for one account to provision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

/// SeedPlan
///
/// What the `seed` binary should provision. Both entries are optional; an
/// account is only planned when its username and password are both set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedPlan {
    pub sysadmin: Option<Account>,
    pub sample_user: Option<Account>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Skipped,
    NotConfigured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub sysadmin: Outcome,
    pub sample_user: Outcome,
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl SeedPlan {
    /// Reads `SYSADMIN_USERNAME`/`SYSADMIN_PASSWORD` and
    /// `SAMPLE_USERNAME`/`SAMPLE_EMAIL`/`SAMPLE_PASSWORD`.
    pub fn from_env() -> Self {
        let account = |user_key: &str, email_key: Option<&str>, pass_key: &str| {
            Some(Account {
                username: non_empty(user_key)?,
                email: email_key.and_then(non_empty),
                password: non_empty(pass_key)?,
            })
        };

        SeedPlan {
            sysadmin: account("SYSADMIN_USERNAME", None, "SYSADMIN_PASSWORD"),
            sample_user: account("SAMPLE_USERNAME", Some("SAMPLE_EMAIL"), "SAMPLE_PASSWORD"),
        }
    }
}

/// run
///
/// Provisions the planned accounts. Existing usernames are left untouched, so
/// running it twice is harmless.
pub async fn run(
    repo: &dyn Repository,
    hasher: &dyn PasswordHasher,
    plan: &SeedPlan,
) -> AppResult<SeedReport> {
    let sysadmin = match &plan.sysadmin {
        None => Outcome::NotConfigured,
        Some(account) => {
            if repo.find_sysadmin_by_username(&account.username).await?.is_some() {
                tracing::warn!(username = %account.username, "sysadmin already exists, skipping");
                Outcome::Skipped
            } else {
                let hash = hasher.hash(&account.password).await?;
                let admin = repo.create_sysadmin(&account.username, hash).await?;
                tracing::info!(sysadmin_id = %admin.id, username = %admin.username, "sysadmin created");
                Outcome::Created
            }
        }
    };

    let sample_user = match &plan.sample_user {
        None => Outcome::NotConfigured,
        Some(account) => {
            if repo.find_user_by_username(&account.username).await?.is_some() {
                tracing::warn!(username = %account.username, "sample user already exists, skipping");
                Outcome::Skipped
            } else {
                let password_hash = hasher.hash(&account.password).await?;
                let user = repo
                    .create_user(NewUser {
                        username: account.username.clone(),
                        email: normalize_email(account.email.as_deref()),
                        password_hash,
                    })
                    .await?;
                tracing::info!(user_id = %user.id, username = %user.username, "sample user created");
                Outcome::Created
            }
        }
    };

    Ok(SeedReport {
        sysadmin,
        sample_user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hashing::MockHasher, repository::InMemoryRepository};

    fn plan() -> SeedPlan {
        SeedPlan {
            sysadmin: Some(Account {
                username: "root".into(),
                email: None,
                password: "root-secret".into(),
            }),
            sample_user: Some(Account {
                username: "sample".into(),
                email: Some("sample@example.com".into()),
                password: "sample-secret".into(),
            }),
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let repo = InMemoryRepository::new();

        let first = run(&repo, &MockHasher, &plan()).await.unwrap();
        assert_eq!(first.sysadmin, Outcome::Created);
        assert_eq!(first.sample_user, Outcome::Created);

        let second = run(&repo, &MockHasher, &plan()).await.unwrap();
        assert_eq!(second.sysadmin, Outcome::Skipped);
        assert_eq!(second.sample_user, Outcome::Skipped);

        let admin = repo.find_sysadmin_by_username("root").await.unwrap().unwrap();
        assert!(MockHasher.verify("root-secret", &admin.password_hash).await.unwrap());
        let user = repo.find_user_by_username("sample").await.unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("sample@example.com"));
    }

    #[tokio::test]
    async fn empty_plan_does_nothing() {
        let repo = InMemoryRepository::new();
        let report = run(&repo, &MockHasher, &SeedPlan::default()).await.unwrap();
        assert_eq!(report.sysadmin, Outcome::NotConfigured);
        assert_eq!(report.sample_user, Outcome::NotConfigured);
        assert!(repo.list_users().await.unwrap().is_empty());
    }
}
