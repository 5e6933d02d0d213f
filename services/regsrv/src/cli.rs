//! Command-line surface
//!
//! Every command prints one JSON document on stdout. Failures print the
//! error's `{kind, message, field}` triple and exit non-zero.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::app_state::AppState;
use crate::error::Result;
use crate::models::{
    CreateConnection, CreateRegister, CreateSlave, ProtocolType, UpdateConnection,
    UpdateRegister, UpdateSlave,
};
use crate::validation;

#[derive(Parser, Debug)]
#[command(name = "regsrv")]
#[command(about = "Modbus connection, slave and register registry")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: config/regsrv.yaml)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overrides database.path
    #[arg(long = "db", global = true)]
    pub db: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database schema
    Init,

    /// Print every connection with its slaves
    Tree,

    /// Manage connections
    Connection {
        #[command(subcommand)]
        command: ConnectionCommands,
    },

    /// Manage slaves
    Slave {
        #[command(subcommand)]
        command: SlaveCommands,
    },

    /// Manage register entries
    Register {
        #[command(subcommand)]
        command: RegisterCommands,
    },

    /// Show the register set served at one endpoint
    Resolve {
        #[arg(long)]
        port: i64,
        /// Slave address
        #[arg(long = "slave")]
        slave_address: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConnectionCommands {
    Create {
        #[arg(long)]
        name: String,
        /// Omit or pass 0 to allocate the next free port
        #[arg(long)]
        port: Option<i64>,
        /// rtu_over_tcp or tcp
        #[arg(long = "protocol", default_value = "tcp")]
        protocol_type: ProtocolType,
    },
    Update {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        port: i64,
        #[arg(long = "protocol")]
        protocol_type: ProtocolType,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SlaveCommands {
    Create {
        #[arg(long = "connection")]
        connection_id: String,
        #[arg(long)]
        name: String,
        #[arg(long = "address")]
        slave_address: i64,
    },
    Update {
        #[arg(long = "connection")]
        connection_id: String,
        #[arg(long = "id")]
        slave_id: String,
        #[arg(long)]
        name: String,
        #[arg(long = "address")]
        slave_address: i64,
    },
    Delete {
        #[arg(long = "connection")]
        connection_id: String,
        #[arg(long = "id")]
        slave_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum RegisterCommands {
    List {
        #[arg(long = "slave")]
        slave_id: String,
    },
    Create {
        #[arg(long = "connection")]
        connection_id: String,
        #[arg(long = "slave")]
        slave_id: String,
        #[arg(long = "start", allow_negative_numbers = true)]
        start_address: i64,
        #[arg(long = "hex")]
        hex_payload: String,
        #[arg(long, default_value = "")]
        names: String,
        #[arg(long, default_value = "")]
        coefficients: String,
    },
    Update {
        #[arg(long = "connection")]
        connection_id: String,
        #[arg(long = "slave")]
        slave_id: String,
        #[arg(long = "id")]
        register_id: String,
        #[arg(long = "start", allow_negative_numbers = true)]
        start_address: i64,
        #[arg(long = "hex")]
        hex_payload: String,
        #[arg(long, default_value = "")]
        names: String,
        #[arg(long, default_value = "")]
        coefficients: String,
    },
    Delete {
        #[arg(long = "connection")]
        connection_id: String,
        #[arg(long = "slave")]
        slave_id: String,
        #[arg(long = "id")]
        register_id: String,
    },
}

/// Run one command against an opened registry
pub async fn execute(command: Commands, state: &AppState) -> Result<Value> {
    match command {
        Commands::Init => Ok(json!({
            "database": state.sqlite_client.path(),
            "status": "initialized",
        })),
        Commands::Tree => to_json(state.connections.list_tree().await?),
        Commands::Connection { command } => connection_command(command, state).await,
        Commands::Slave { command } => slave_command(command, state).await,
        Commands::Register { command } => register_command(command, state).await,
        Commands::Resolve {
            port,
            slave_address,
        } => {
            let port = validation::port(port)?;
            let slave_address = validation::slave_address(slave_address)?;
            let registers = state.registers.resolve_endpoint(port, slave_address).await?;
            Ok(json!({
                "port": port,
                "slave_address": slave_address,
                "registers": registers.as_slice(),
            }))
        },
    }
}

async fn connection_command(command: ConnectionCommands, state: &AppState) -> Result<Value> {
    match command {
        ConnectionCommands::Create {
            name,
            port,
            protocol_type,
        } => to_json(
            state
                .connections
                .create(CreateConnection {
                    name,
                    port,
                    protocol_type,
                })
                .await?,
        ),
        ConnectionCommands::Update {
            id,
            name,
            port,
            protocol_type,
        } => to_json(
            state
                .connections
                .update(UpdateConnection {
                    id,
                    name,
                    port,
                    protocol_type,
                })
                .await?,
        ),
        ConnectionCommands::Delete { id } => {
            state.connections.delete(&id).await?;
            Ok(json!({ "deleted": id }))
        },
    }
}

async fn slave_command(command: SlaveCommands, state: &AppState) -> Result<Value> {
    match command {
        SlaveCommands::Create {
            connection_id,
            name,
            slave_address,
        } => to_json(
            state
                .slaves
                .create(CreateSlave {
                    connection_id,
                    name,
                    slave_address,
                })
                .await?,
        ),
        SlaveCommands::Update {
            connection_id,
            slave_id,
            name,
            slave_address,
        } => to_json(
            state
                .slaves
                .update(UpdateSlave {
                    connection_id,
                    slave_id,
                    name,
                    slave_address,
                })
                .await?,
        ),
        SlaveCommands::Delete {
            connection_id,
            slave_id,
        } => {
            state.slaves.delete(&connection_id, &slave_id).await?;
            Ok(json!({ "deleted": slave_id }))
        },
    }
}

async fn register_command(command: RegisterCommands, state: &AppState) -> Result<Value> {
    match command {
        RegisterCommands::List { slave_id } => to_json(state.registers.list(&slave_id).await?),
        RegisterCommands::Create {
            connection_id,
            slave_id,
            start_address,
            hex_payload,
            names,
            coefficients,
        } => to_json(
            state
                .registers
                .create(CreateRegister {
                    connection_id,
                    slave_id,
                    start_address,
                    hex_payload,
                    names,
                    coefficients,
                })
                .await?,
        ),
        RegisterCommands::Update {
            connection_id,
            slave_id,
            register_id,
            start_address,
            hex_payload,
            names,
            coefficients,
        } => to_json(
            state
                .registers
                .update(UpdateRegister {
                    connection_id,
                    slave_id,
                    register_id,
                    start_address,
                    hex_payload,
                    names,
                    coefficients,
                })
                .await?,
        ),
        RegisterCommands::Delete {
            connection_id,
            slave_id,
            register_id,
        } => {
            state
                .registers
                .delete(&connection_id, &slave_id, &register_id)
                .await?;
            Ok(json!({ "deleted": register_id }))
        },
    }
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| crate::error::RegistryError::Internal(e.to_string()))
}
