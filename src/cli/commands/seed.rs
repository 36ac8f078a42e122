use anyhow::Context;
use serde_json::json;

use crate::auth::password::hash_password;
use crate::database::models::{Gender, NewCompany, NewUser};
use crate::database::{companies, users, DatabaseManager};

const SAMPLE_EMAIL: &str = "sample@example.com";
const SAMPLE_PASSWORD: &str = "password123";

/// Insert the sample user and their company; rows that already exist are kept.
pub async fn handle() -> anyhow::Result<()> {
    let pool = DatabaseManager::pool()?;

    let user = match users::find_by_email(&pool, SAMPLE_EMAIL).await? {
        Some(existing) => {
            tracing::info!("Sample user already exists (id {})", existing.id);
            existing
        }
        None => {
            let created = users::create(
                &pool,
                NewUser {
                    email: SAMPLE_EMAIL.to_string(),
                    password_hash: hash_password(SAMPLE_PASSWORD)?,
                    full_name: "Sample User".to_string(),
                    signup_type: "e".to_string(),
                    gender: Gender::Male,
                    mobile_no: Some("+1234567890".to_string()),
                    is_mobile_verified: true,
                    is_email_verified: true,
                },
            )
            .await
            .context("failed to insert sample user")?;
            tracing::info!("Inserted sample user (id {})", created.id);
            created
        }
    };

    if let Some(existing) = companies::find_by_owner(&pool, user.id).await? {
        tracing::info!("Sample company already exists (id {})", existing.id);
    } else {
        let company: NewCompany = serde_json::from_value(json!({
            "company_name": "Sample Company Inc.",
            "address": "123 Business Street",
            "city": "New York",
            "state": "NY",
            "country": "USA",
            "postal_code": "10001",
            "website": "https://samplecompany.com",
            "industry": "Technology",
            "description": "A sample company for demonstration purposes"
        }))?;
        let created = companies::create(&pool, user.id, company)
            .await
            .context("failed to insert sample company")?;
        tracing::info!("Inserted sample company (id {})", created.id);
    }

    DatabaseManager::close().await;
    Ok(())
}
