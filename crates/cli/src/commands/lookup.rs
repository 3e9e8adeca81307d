use clap::{Args, Subcommand};
use pagerform_api::PagerDutyApi;
use pagerform_provider::{
    lookup_escalation_policy, lookup_service, lookup_team, lookup_user, lookup_vendor,
};
use serde::Serialize;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct LookupArgs {
    #[command(subcommand)]
    pub command: LookupCommand,
}

#[derive(Subcommand, Debug)]
pub enum LookupCommand {
    /// Find a user by email address.
    User {
        /// Exact email address.
        email: String,
    },
    /// Find a team by name.
    Team {
        /// Exact team name.
        name: String,
    },
    /// Find an escalation policy by name.
    EscalationPolicy {
        /// Exact policy name.
        name: String,
    },
    /// Find a service by name.
    Service {
        /// Exact service name.
        name: String,
    },
    /// Find a vendor by name, falling back to a partial match.
    Vendor {
        /// Vendor name or regular expression.
        name: String,
    },
}

fn print<T: Serialize>(
    value: &T,
    id: &str,
    name: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => println!("{id} | {name}"),
    }
    Ok(())
}

pub async fn run(
    api: &dyn PagerDutyApi,
    args: &LookupArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match &args.command {
        LookupCommand::User { email } => {
            let user = lookup_user(api, email).await?;
            print(&user, &user.id, &format!("{} <{}>", user.name, user.email), format)
        }
        LookupCommand::Team { name } => {
            let team = lookup_team(api, name).await?;
            print(&team, &team.id, &team.name, format)
        }
        LookupCommand::EscalationPolicy { name } => {
            let policy = lookup_escalation_policy(api, name).await?;
            print(&policy, &policy.id, &policy.name, format)
        }
        LookupCommand::Service { name } => {
            let service = lookup_service(api, name).await?;
            print(&service, &service.id, &service.name, format)
        }
        LookupCommand::Vendor { name } => {
            let vendor = lookup_vendor(api, name).await?;
            let label = match &vendor.generic_service_type {
                Some(kind) => format!("{} ({kind})", vendor.name),
                None => vendor.name.clone(),
            };
            print(&vendor, &vendor.id, &label, format)
        }
    }
}
