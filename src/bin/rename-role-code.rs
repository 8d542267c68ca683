//! 角色代码迁移工具
//!
//! 用法: rename-role-code --from member --to client [--type USER_ROLE]

use anyhow::{anyhow, bail, Context};
use gym_access::{
    config::AppConfig, db, models::lookup::USER_ROLE, services::VocabularyService, telemetry,
};

#[derive(Debug, PartialEq, Eq)]
struct RenameArgs {
    from: String,
    to: String,
    type_code: String,
}

fn parse_args(args: &[String]) -> anyhow::Result<Option<RenameArgs>> {
    let mut from = None;
    let mut to = None;
    let mut type_code = USER_ROLE.to_string();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(None),
            "--from" => from = Some(iter.next().ok_or_else(|| anyhow!("--from 需要一个值"))?.clone()),
            "--to" => to = Some(iter.next().ok_or_else(|| anyhow!("--to 需要一个值"))?.clone()),
            "--type" => type_code = iter.next().ok_or_else(|| anyhow!("--type 需要一个值"))?.clone(),
            other => bail!("未知参数: {}", other),
        }
    }

    Ok(Some(RenameArgs {
        from: from.ok_or_else(|| anyhow!("缺少 --from"))?,
        to: to.ok_or_else(|| anyhow!("缺少 --to"))?,
        type_code,
    }))
}

fn print_help() {
    println!("rename-role-code {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: rename-role-code --from <旧代码> --to <新代码> [--type <词表类型>]");
    println!();
    println!("在一个事务内重命名词表取值、所有引用它的角色权限关联以及对应的角色");
    println!("默认词表类型: {}", USER_ROLE);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(args) = parse_args(&args)? else {
        print_help();
        return Ok(());
    };

    dotenv::dotenv().ok();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    telemetry::init_telemetry(&config.logging);

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let service = VocabularyService::new(pool);
    let report = service
        .rename_lookup_value(&args.type_code, &args.from, &args.to)
        .await
        .with_context(|| format!("Failed to rename '{}' to '{}'", args.from, args.to))?;

    println!("type:    {}", report.type_code);
    println!("plan:    {:?}", report.plan);
    println!("before:  {}={} {}={}", report.from, report.before.from, report.to, report.before.to);
    println!("after:   {}={} {}={}", report.from, report.after.from, report.to, report.after.to);
    println!("merged:  {}", report.merged);
    if let (Some(before), Some(after)) = (report.roles_before, report.roles_after) {
        println!("roles:   {}={} {}={}", report.from, before.from, report.to, before.to);
        println!("         -> {}={} {}={}", report.from, after.from, report.to, after.to);
    }

    Ok(())
}
