// Card records

use super::{decode_records, encode_metadata, require_text};
use crate::auth::interceptor::AuthenticatedContext;
use crate::core::errors::KeeperError;
use crate::core::models::{CardAddRequest, CardData, Record};
use crate::storage::SecretStore;
use std::sync::Arc;
use tracing::info;

pub struct CardService {
    store: Arc<dyn SecretStore>,
}

impl CardService {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    pub async fn add(
        &self,
        ctx: &AuthenticatedContext,
        request: CardAddRequest,
    ) -> Result<i64, KeeperError> {
        ctx.ensure_active()?;
        validate_card(&request.card)?;
        let metadata = encode_metadata(&request.metadata)?;

        ctx.ensure_active()?;
        let owner = ctx.principal().user_id;
        let id = self.store.card_add(owner, &request.card, metadata).await?;

        info!(user_id = %owner, card_id = id, "Card stored");
        Ok(id)
    }

    pub async fn list(&self, ctx: &AuthenticatedContext) -> Result<Vec<Record<CardData>>, KeeperError> {
        ctx.ensure_active()?;
        let rows = self.store.card_list(ctx.principal().user_id).await?;
        decode_records(ctx, rows)
    }

    pub async fn delete(&self, ctx: &AuthenticatedContext, id: i64) -> Result<(), KeeperError> {
        ctx.ensure_active()?;
        let owner = ctx.principal().user_id;
        self.store.card_delete(owner, id).await?;

        info!(user_id = %owner, card_id = id, "Card deleted");
        Ok(())
    }
}

/// Field rules for a payment card
pub fn validate_card(card: &CardData) -> Result<(), KeeperError> {
    let number: String = card.number.chars().filter(|c| *c != ' ').collect();
    if !number.chars().all(|c| c.is_ascii_digit()) || !(12..=19).contains(&number.len()) {
        return Err(KeeperError::Validation(
            "card number must be 12 to 19 digits".to_string(),
        ));
    }

    require_text("card holder", &card.holder)?;

    if !is_valid_expiry(&card.expires) {
        return Err(KeeperError::Validation(
            "card expiry must be MM/YY".to_string(),
        ));
    }

    let cvc_ok = (3..=4).contains(&card.cvc.len()) && card.cvc.chars().all(|c| c.is_ascii_digit());
    if !cvc_ok {
        return Err(KeeperError::Validation("card cvc must be 3 or 4 digits".to_string()));
    }

    Ok(())
}

fn is_valid_expiry(expires: &str) -> bool {
    let Some((month, year)) = expires.split_once('/') else {
        return false;
    };
    let two_digits = |s: &str| s.len() == 2 && s.chars().all(|c| c.is_ascii_digit());
    if !two_digits(month) || !two_digits(year) {
        return false;
    }
    matches!(month.parse::<u8>(), Ok(1..=12))
}
