use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use specter_discovery::Discovery;
use specter_graphql::introspection::{self, SeedSchema, INTROSPECTION_QUERY};
use specter_graphql::{GraphQLRequest, ObjectArena, ProbeClient, ProbeTransport};
use tracing::info;

use crate::{CliError, FuzzArgs, IntrospectArgs};

pub async fn fuzz(args: FuzzArgs) -> Result<(), CliError> {
    let config = args.client.to_config()?;
    let transport = Arc::new(ProbeClient::new(&config)?);
    let words = read_wordlist(&args.wordlist)?;

    let mut arena = ObjectArena::new();
    let seed = match &args.schema {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
                path: path.clone(),
                source,
            })?;
            let document = introspection::parse_document(&raw)?;
            introspection::populate(&mut arena, &document)
        }
        None => SeedSchema::default(),
    };

    let mut discovery = Discovery::with_seed(transport, words, args.threads, arena, seed);
    discovery.seed_targets(&args.targets);

    let outcome = discovery.run().await;
    let document = outcome.to_introspection();
    let json = serde_json::to_string_pretty(&document)?;
    std::fs::write(&args.output, json).map_err(|source| CliError::Write {
        path: args.output.clone(),
        source,
    })?;

    info!(
        types = outcome.type_map.len(),
        words = outcome.found_words.len(),
        output = %args.output.display(),
        "schema written"
    );
    Ok(())
}

pub async fn introspect(args: IntrospectArgs) -> Result<(), CliError> {
    let config = args.client.to_config()?;
    let client = ProbeClient::new(&config)?;

    let response = client
        .post(GraphQLRequest {
            operation_name: Some("IntrospectionQuery".to_string()),
            variables: HashMap::new(),
            query: INTROSPECTION_QUERY.to_string(),
        })
        .await?;

    std::fs::write(&args.output, &response.raw).map_err(|source| CliError::Write {
        path: args.output.clone(),
        source,
    })?;

    info!(
        status = response.status,
        output = %args.output.display(),
        "introspection response written"
    );
    Ok(())
}

fn read_wordlist(path: &Path) -> Result<Vec<String>, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
