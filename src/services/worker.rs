use crate::services::accounts::AccountService;
use sea_orm::DatabaseConnection;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

/// Periodic housekeeping: removes session rows past their expiry.
pub struct SessionSweeper {
    db: DatabaseConnection,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl SessionSweeper {
    pub fn new(db: DatabaseConnection, interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            db,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("🚀 Session sweeper started (every {:?})", self.interval);

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Session sweeper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.sweep().await;
                }
            }
        }
    }

    async fn sweep(&self) {
        match AccountService::purge_expired_sessions(&self.db).await {
            Ok(0) => tracing::debug!("No expired sessions"),
            Ok(n) => tracing::info!("🧹 Removed {} expired session(s)", n),
            Err(e) => tracing::error!("Session sweep failed: {}", e.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{prelude::*, sessions, users};
    use crate::infrastructure::database::connect_in_memory;
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

    #[tokio::test]
    async fn test_sweep_removes_only_expired_sessions() {
        let db = connect_in_memory().await.unwrap();
        users::ActiveModel {
            id: Set("u1".to_string()),
            username: Set("sweeper".to_string()),
            actual_name: Set("Sweeper".to_string()),
            password_hash: Set("x".to_string()),
            is_admin: Set(false),
            is_active: Set(true),
            user_limit: Set(10),
            current_usage: Set(0),
            created_at: Set(None),
        }
        .insert(&db)
        .await
        .unwrap();

        for (id, offset) in [("old", -5), ("fresh", 5)] {
            sessions::ActiveModel {
                id: Set(id.to_string()),
                user_id: Set("u1".to_string()),
                created_at: Set(Utc::now()),
                expires_at: Set(Utc::now() + chrono::Duration::minutes(offset)),
            }
            .insert(&db)
            .await
            .unwrap();
        }

        let (_tx, rx) = watch::channel(false);
        SessionSweeper::new(db.clone(), Duration::from_secs(60), rx)
            .sweep()
            .await;

        assert_eq!(Sessions::find().count(&db).await.unwrap(), 1);
        assert!(Sessions::find_by_id("fresh").one(&db).await.unwrap().is_some());
    }
}
