//! The save, reload, fetch and delete walkthrough.

use strome_core::graph::DeleteOutcome;
use strome_core::mapping::{Entity, Projection};
use strome_core::store::{Criterion, EntityKey, Store};
use strome_core::Context;
use strome_proto::{codec, EncodeOptions};

use crate::error::DemoError;
use crate::model::{User, UserSummary};

/// What each walkthrough step produced.
#[derive(Debug)]
pub struct Report {
    /// Encoded dictionary of the user.
    pub dictionary: String,
    /// Key the user was saved under.
    pub key: EntityKey,
    /// Users matching the fetch criteria.
    pub matches: Vec<UserSummary>,
    /// Result of deleting the user through the graph.
    pub outcome: DeleteOutcome,
    /// Stored users left after the delete.
    pub remaining: usize,
}

/// Fetch criteria for users at least `min_age` years old.
pub fn adult_criteria(min_age: i64) -> Vec<Criterion> {
    vec![
        Criterion::ge("age", min_age),
        Criterion::is_not_null("name.firstName"),
    ]
}

/// Run the walkthrough for `user` against the context's store.
pub fn run<S: Store>(
    ctx: &Context<S>,
    user: &User,
    min_age: i64,
    options: EncodeOptions,
) -> Result<Report, DemoError> {
    let encoded = codec::encode_mapping(&user.to_dictionary(), options)?;
    let dictionary = String::from_utf8_lossy(&encoded).into_owned();

    let key = ctx.save(user)?;
    tracing::info!(%key, name = %user.full_name(), "user saved");

    let reloaded: User = ctx.load(key.id)?;
    if &reloaded != user {
        return Err(DemoError::RoundTrip(key.to_string()));
    }

    let matches = UserSummary::fetch(ctx.store(), &adult_criteria(min_age))?;
    tracing::info!(min_age, count = matches.len(), "fetched users");

    let graph = ctx.graph();
    ctx.attach::<User>(&graph, key.id)?;
    let outcome = ctx.delete_in_graph(&graph, key.id)?;
    let remaining = ctx.fetch::<User>(&[])?.len();

    Ok(Report {
        dictionary,
        key,
        matches,
        outcome,
        remaining,
    })
}

/// JSON description of every entity schema reachable from [`User`].
pub fn schema_json<S: Store>(ctx: &Context<S>) -> Result<String, DemoError> {
    ctx.catalog().register::<User>()?;
    let schemas: Vec<_> = ctx
        .catalog()
        .entity_names()
        .iter()
        .filter_map(|name| ctx.catalog().get(name))
        .collect();
    Ok(serde_json::to_string_pretty(&schemas)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strome_core::MemoryStore;

    #[test]
    fn test_run_in_memory() {
        let ctx = Context::new(MemoryStore::new());
        let report = run(&ctx, &User::sample(), 18, EncodeOptions::compact()).unwrap();

        assert!(report.dictionary.starts_with("{\"addresses\":["));
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].full_name, "Ravi Prakash Maurya");
        // User, Name and two addresses.
        assert_eq!(report.outcome.deleted.len(), 4);
        assert_eq!(report.outcome.deleted[0], ("User".to_string(), report.key.id));
        assert_eq!(report.remaining, 0);
        assert!(ctx.store().is_empty());
    }

    #[test]
    fn test_fetch_filters_by_age() {
        let ctx = Context::new(MemoryStore::new());
        let report = run(&ctx, &User::sample(), 50, EncodeOptions::compact()).unwrap();
        assert!(report.matches.is_empty());
    }

    #[test]
    fn test_schema_json() {
        let ctx = Context::new(MemoryStore::new());
        let json = schema_json(&ctx).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let names: Vec<_> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Address", "Name", "User"]);
    }
}
