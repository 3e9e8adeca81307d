use anyhow::{Context, bail};
use clap::{Args, Subcommand, ValueEnum};
use pagerform_api::PagerDutyApi;
use pagerform_provider::{
    AddonResource, EscalationPolicyResource, ExtensionResource, MaintenanceWindowResource,
    Resource, ResourceData, ServiceIntegrationResource, TeamMembershipResource, UserResource,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ResourceArgs {
    /// Object type.
    pub kind: ResourceKind,
    #[command(subcommand)]
    pub action: ResourceAction,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ResourceKind {
    User,
    TeamMembership,
    EscalationPolicy,
    Extension,
    MaintenanceWindow,
    Addon,
    ServiceIntegration,
}

#[derive(Subcommand, Debug)]
pub enum ResourceAction {
    /// Create an object and print its state.
    Create {
        /// JSON attributes (string, @file path, or - for stdin).
        #[arg(long)]
        data: String,
    },
    /// Refresh the state of an existing object.
    Read {
        /// JSON state as printed by create (string, @file path, or - for stdin).
        #[arg(long)]
        state: Option<String>,
        /// Object ID; overrides the ID in the state document.
        #[arg(long)]
        id: Option<String>,
    },
    /// Push local attributes to an existing object.
    Update {
        /// JSON state with the desired attributes.
        #[arg(long)]
        state: String,
        /// Object ID; overrides the ID in the state document.
        #[arg(long)]
        id: Option<String>,
    },
    /// Delete an object.
    Delete {
        /// JSON state as printed by create.
        #[arg(long)]
        state: Option<String>,
        /// Object ID; overrides the ID in the state document.
        #[arg(long)]
        id: Option<String>,
    },
    /// Adopt an object created outside pagerform.
    Import {
        /// Import ID, e.g. `user_id:team_id` for team memberships.
        id: String,
    },
}

fn parse_json_data(input: &str) -> anyhow::Result<serde_json::Value> {
    if input == "-" {
        let content = std::io::read_to_string(std::io::stdin())?;
        Ok(serde_json::from_str(&content)?)
    } else if let Some(path) = input.strip_prefix('@') {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(input)?)
    }
}

fn load_state<A: DeserializeOwned + Default>(
    state: Option<&str>,
    id: Option<&str>,
) -> anyhow::Result<ResourceData<A>> {
    let mut data = match state {
        Some(input) => serde_json::from_value(parse_json_data(input)?)?,
        None => ResourceData::new(A::default()),
    };
    if let Some(id) = id {
        data.set_id(id);
    }
    if data.id().is_none_or(str::is_empty) {
        bail!("an object ID is required: pass --id or a state document with an \"id\" field");
    }
    Ok(data)
}

fn report<A: Serialize>(
    data: &ResourceData<A>,
    summary: &str,
    with_state: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFormat::Text => {
            println!("{summary}");
            if with_state {
                println!("{}", serde_json::to_string_pretty(data)?);
            }
        }
    }
    Ok(())
}

async fn run_with<R: Resource>(
    resource: &R,
    api: &dyn PagerDutyApi,
    action: &ResourceAction,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let name = resource.type_name();

    match action {
        ResourceAction::Create { data } => {
            let attrs: R::Attrs = serde_json::from_value(parse_json_data(data)?)?;
            let mut state = ResourceData::new(attrs);
            resource.create(api, &mut state).await?;
            let id = state.id().unwrap_or_default();
            report(&state, &format!("Created {name} {id}"), true, format)
        }
        ResourceAction::Read { state, id } => {
            let mut data = load_state::<R::Attrs>(state.as_deref(), id.as_deref())?;
            let requested = data.id().unwrap_or_default().to_owned();
            resource.read(api, &mut data).await?;
            if data.id().is_none() {
                report(&data, &format!("{name} {requested} no longer exists."), false, format)
            } else {
                report(&data, &format!("Read {name} {requested}"), true, format)
            }
        }
        ResourceAction::Update { state, id } => {
            let mut data = load_state::<R::Attrs>(Some(state), id.as_deref())?;
            let requested = data.id().unwrap_or_default().to_owned();
            resource.update(api, &mut data).await?;
            if data.id().is_none() {
                report(&data, &format!("{name} {requested} no longer exists."), false, format)
            } else {
                report(&data, &format!("Updated {name} {requested}"), true, format)
            }
        }
        ResourceAction::Delete { state, id } => {
            let mut data = load_state::<R::Attrs>(state.as_deref(), id.as_deref())?;
            let requested = data.id().unwrap_or_default().to_owned();
            resource.delete(api, &mut data).await?;
            report(&data, &format!("Deleted {name} {requested}"), false, format)
        }
        ResourceAction::Import { id } => {
            let data = resource.import(api, id).await?;
            report(&data, &format!("Imported {name} {id}"), true, format)
        }
    }
}

pub async fn run(
    api: &dyn PagerDutyApi,
    args: &ResourceArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let action = &args.action;
    match args.kind {
        ResourceKind::User => run_with(&UserResource, api, action, format).await,
        ResourceKind::TeamMembership => {
            run_with(&TeamMembershipResource::default(), api, action, format).await
        }
        ResourceKind::EscalationPolicy => {
            run_with(&EscalationPolicyResource, api, action, format).await
        }
        ResourceKind::Extension => run_with(&ExtensionResource, api, action, format).await,
        ResourceKind::MaintenanceWindow => {
            run_with(&MaintenanceWindowResource, api, action, format).await
        }
        ResourceKind::Addon => run_with(&AddonResource, api, action, format).await,
        ResourceKind::ServiceIntegration => {
            run_with(&ServiceIntegrationResource, api, action, format).await
        }
    }
}
