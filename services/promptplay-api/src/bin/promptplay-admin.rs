//! PromptPlay 数据库维护工具

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use promptplay_api::infrastructure::admin::{DatabaseAdmin, DatabaseStats};
use promptplay_bootstrap::connect_postgres;
use promptplay_config::AppConfig;
use promptplay_telemetry::init_tracing;

#[derive(Parser)]
#[command(name = "promptplay-admin", version, about = "PromptPlay database maintenance")]
struct Cli {
    /// 配置目录
    #[arg(long, default_value = "config")]
    config_dir: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 显示行数和用户列表
    Stats,
    /// 删除全部数据，保留表结构
    ClearAll {
        /// 跳过确认
        #[arg(long)]
        yes: bool,
    },
    /// 只删除组局和加入申请
    ClearGames {
        #[arg(long)]
        yes: bool,
    },
    /// 删除所有表并重新迁移
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

fn print_stats(stats: &DatabaseStats) {
    println!("Users:         {}", stats.users);
    println!("Game requests: {}", stats.game_requests);
    println!("Join requests: {}", stats.join_requests);
    for user in &stats.user_list {
        let kind = if user.is_guest { "guest" } else { "registered" };
        println!("  #{} {} ({})", user.id, user.username, kind);
    }
}

fn require_confirmation(yes: bool, action: &str) -> anyhow::Result<()> {
    if !yes {
        bail!("Refusing to {} without --yes", action);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config_dir).context("Failed to load configuration")?;
    init_tracing(&config.telemetry.log_level);

    let pool = connect_postgres(&config)
        .await
        .context("Failed to connect to PostgreSQL")?;
    let admin = DatabaseAdmin::new(pool);

    match cli.command {
        Command::Stats => {
            print_stats(&admin.stats().await?);
        }
        Command::ClearAll { yes } => {
            require_confirmation(yes, "delete all data")?;
            print_stats(&admin.stats().await?);
            let report = admin.clear_all().await?;
            println!(
                "Deleted {} join requests, {} game requests, {} users",
                report.join_requests, report.game_requests, report.users
            );
            print_stats(&admin.stats().await?);
        }
        Command::ClearGames { yes } => {
            require_confirmation(yes, "delete all games")?;
            print_stats(&admin.stats().await?);
            let report = admin.clear_games().await?;
            println!(
                "Deleted {} join requests, {} game requests",
                report.join_requests, report.game_requests
            );
            print_stats(&admin.stats().await?);
        }
        Command::Reset { yes } => {
            require_confirmation(yes, "drop and recreate all tables")?;
            print_stats(&admin.stats().await?);
            admin.reset().await?;
            println!("Database schema recreated");
            print_stats(&admin.stats().await?);
        }
    }

    Ok(())
}
