mod serve;

use std::process::ExitCode;

use cointick_core::{
    GlobalMetricsRequest, HistoricalQuotesRequest, InfoRequest, ListingsRequest,
    MarketOverviewRequest, OhlcvRequest, QuotesRequest, SearchRequest, Symbol,
};

use crate::cli::{Cli, Command, SelectionArgs};
use crate::error::{CliError, ToolError};
use crate::output;
use crate::service::ToolService;
use crate::tools::{self, SymbolList, ToolCall};

pub async fn run(cli: &Cli, service: &ToolService) -> Result<ExitCode, CliError> {
    let call = match &cli.command {
        Command::Serve => {
            serve::run(service.clone()).await?;
            return Ok(ExitCode::SUCCESS);
        }
        command => tool_call(command),
    };

    let result = match call {
        Ok(call) => service.call(&call).await,
        Err(error) => Err(error),
    };

    let rendered = result.and_then(|answer| {
        tracing::debug!(cached = answer.cached, "tool call completed");
        output::success(None, &answer, cli.pretty)
    });

    match rendered {
        Ok(rendered) => {
            println!("{rendered}");
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            tracing::error!(code = error.code(), "command failed");
            println!("{}", output::failure(None, &error, cli.pretty));
            Ok(ExitCode::from(error.exit_code()))
        }
    }
}

/// Translate a one-shot subcommand into the tool call it stands for.
fn tool_call(command: &Command) -> Result<ToolCall, ToolError> {
    let call = match command {
        Command::Quote(args) => ToolCall::Price(
            QuotesRequest::new(selection(&args.selection)?)
                .with_convert(tools::currency(Some(args.convert.clone()))?),
        ),
        Command::Info(args) => ToolCall::Info(InfoRequest::new(selection(args)?)),
        Command::Listings(args) => ToolCall::Top(
            ListingsRequest::new(args.start, args.limit)?
                .with_convert(tools::currency(Some(args.convert.clone()))?)
                .with_sort(args.sort, args.sort_dir),
        ),
        Command::Global(args) => ToolCall::GlobalMetrics(GlobalMetricsRequest::new(
            tools::currency(Some(args.convert.clone()))?,
        )),
        Command::Historical(args) => ToolCall::Historical(
            HistoricalQuotesRequest::new(Symbol::parse(&args.symbol)?)
                .with_count(args.count)?
                .with_range(
                    tools::time_bound(args.time_start.clone())?,
                    tools::time_bound(args.time_end.clone())?,
                )
                .with_interval(args.interval)
                .with_convert(tools::currency(Some(args.convert.clone()))?),
        ),
        Command::Ohlcv(args) => ToolCall::Ohlcv(
            OhlcvRequest::new(Symbol::parse(&args.symbol)?)
                .with_count(args.count)?
                .with_period(args.period)
                .with_range(
                    tools::time_bound(args.time_start.clone())?,
                    tools::time_bound(args.time_end.clone())?,
                )
                .with_convert(tools::currency(Some(args.convert.clone()))?),
        ),
        Command::Search(args) => ToolCall::Search(SearchRequest::new(&args.query, args.limit)?),
        Command::Overview(args) => ToolCall::MarketStatistics(
            MarketOverviewRequest::new(args.top)?
                .with_convert(tools::currency(Some(args.convert.clone()))?),
        ),
        Command::CacheStats => ToolCall::CacheStats,
        Command::Serve => {
            return Err(ToolError::InvalidRequest(String::from(
                "serve is not a tool call",
            )))
        }
    };

    Ok(call)
}

fn selection(args: &SelectionArgs) -> Result<cointick_core::AssetSelector, ToolError> {
    let symbols = (!args.symbols.is_empty()).then(|| SymbolList::Items(args.symbols.clone()));
    Ok(tools::selector(symbols.as_ref(), args.ids.clone())?)
}
