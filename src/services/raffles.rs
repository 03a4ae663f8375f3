//! Raffles (sorteios).

use super::{not_found, ServiceResult};
use crate::db::Tenant;
use crate::domain::aggregates::{Raffle, RaffleEntry, RaffleInput, RaffleStatus, RaffleSummary};

pub async fn list(tenant: &Tenant) -> ServiceResult<Vec<Raffle>> {
    let mut raffles = tenant.repo::<Raffle>().list().await?;
    raffles.reverse();
    Ok(raffles)
}

/// Raffles visible on the storefront: open ones and drawn ones (to show the winner).
pub async fn list_public(tenant: &Tenant) -> ServiceResult<Vec<RaffleSummary>> {
    Ok(list(tenant)
        .await?
        .iter()
        .filter(|r| r.status() != RaffleStatus::Closed)
        .map(Raffle::summary)
        .collect())
}

pub async fn get(tenant: &Tenant, id: &str) -> ServiceResult<Raffle> {
    tenant.repo::<Raffle>().get(id).await?.ok_or_else(|| not_found("raffle", id))
}

pub async fn create(tenant: &Tenant, input: &RaffleInput) -> ServiceResult<Raffle> {
    let raffle = Raffle::create(input)?;
    tenant.repo::<Raffle>().save(&raffle).await?;
    Ok(raffle)
}

pub async fn delete(tenant: &Tenant, id: &str) -> ServiceResult<()> {
    if !tenant.repo::<Raffle>().delete(id).await? {
        return Err(not_found("raffle", id));
    }
    Ok(())
}

pub async fn enter(tenant: &Tenant, id: &str, name: &str, phone: &str) -> ServiceResult<RaffleSummary> {
    let mut raffle = get(tenant, id).await?;
    raffle.enter(name, phone)?;
    tenant.repo::<Raffle>().save(&raffle).await?;
    tenant.publish(raffle.take_events()).await;
    Ok(raffle.summary())
}

pub async fn close(tenant: &Tenant, id: &str) -> ServiceResult<Raffle> {
    let mut raffle = get(tenant, id).await?;
    raffle.close()?;
    tenant.repo::<Raffle>().save(&raffle).await?;
    Ok(raffle)
}

/// Picks a winner uniformly among the entries.
pub async fn draw(tenant: &Tenant, id: &str) -> ServiceResult<RaffleEntry> {
    let mut raffle = get(tenant, id).await?;
    let winner = raffle.draw(&mut rand::thread_rng())?.clone();
    tenant.repo::<Raffle>().save(&raffle).await?;
    tenant.publish(raffle.take_events()).await;
    tracing::info!(store = %tenant.id(), raffle_id = %id, entry_id = %winner.id, "raffle drawn");
    Ok(winner)
}
