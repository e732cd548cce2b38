// connexion BD

use sea_orm::{Database, DatabaseConnection, DbErr};

use crate::config::Config;

pub async fn establish_connection(config: &Config) -> Result<DatabaseConnection, DbErr> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| DbErr::Custom("DATABASE_URL must be set in .env file".to_string()))?;

    Database::connect(database_url).await
}
