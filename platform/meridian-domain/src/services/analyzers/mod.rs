pub mod performance;

use crate::entities::metrics::PerformanceSummary;
use crate::value_objects::daily_bar::DailyBar;
use crate::value_objects::daily_state::DailyState;
use crate::value_objects::rebalance_branch::RebalanceBranch;

pub trait Analyzer {
    fn name(&self) -> &'static str;
    fn analyze(&self, input: &AnalyzerInput) -> Result<serde_json::Value, String>;
}

pub struct AnalyzerInput<'a> {
    pub bars: &'a [DailyBar],
    pub states: &'a [DailyState],
    pub drawdown: &'a [f64],
    pub summary: &'a PerformanceSummary,
}

pub fn built_in_analyzers(drawdown_top_n: usize) -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(TradeActivityAnalyzer),
        Box::new(DrawdownAnalyzer {
            top_n: drawdown_top_n,
        }),
    ]
}

#[derive(Debug, Clone, Copy)]
pub struct TradeActivityAnalyzer;

impl Analyzer for TradeActivityAnalyzer {
    fn name(&self) -> &'static str {
        "trade_activity"
    }

    fn analyze(&self, input: &AnalyzerInput) -> Result<serde_json::Value, String> {
        let mut buy_days = 0u64;
        let mut sell_days = 0u64;
        let mut idle_days = 0u64;
        let mut zero_share_buys = 0u64;
        let mut commission_sells = 0u64;
        let mut corporate_action_days = 0u64;
        let mut shares_bought = 0.0f64;
        let mut shares_sold = 0.0f64;
        let mut total_fees = 0.0f64;
        let mut turnover = 0.0f64;

        for (idx, state) in input.states.iter().enumerate() {
            if state.corporate_action {
                corporate_action_days += 1;
            }
            total_fees += state.fees;

            let Some(branch) = state.branch else {
                continue;
            };
            let open = input.bars.get(idx).map(|bar| bar.open).unwrap_or(0.0);
            match branch {
                RebalanceBranch::NoRebalance => idle_days += 1,
                RebalanceBranch::Buy => {
                    buy_days += 1;
                    if state.traded_shares == 0.0 {
                        zero_share_buys += 1;
                    }
                    shares_bought += state.traded_shares;
                    turnover += state.traded_shares * open;
                }
                RebalanceBranch::Sell => {
                    sell_days += 1;
                    if state.fees > 0.0 {
                        commission_sells += 1;
                    }
                    shares_sold += state.traded_shares.abs();
                    turnover += state.traded_shares.abs() * open;
                }
            }
        }

        Ok(serde_json::json!({
            "name": self.name(),
            "days": {
                "buy": buy_days,
                "sell": sell_days,
                "no_rebalance": idle_days,
                "zero_share_buys": zero_share_buys,
                "corporate_actions": corporate_action_days,
            },
            "shares": {
                "bought": shares_bought,
                "sold": shares_sold,
            },
            "costs": {
                "total_fees": total_fees,
                "commission_sells": commission_sells,
            },
            "turnover": turnover,
            "meta": {
                "days_processed": input.summary.days,
            }
        }))
    }
}

/// Ranks drawdown episodes (peak to recovery) by depth.
#[derive(Debug, Clone, Copy)]
pub struct DrawdownAnalyzer {
    pub top_n: usize,
}

impl Analyzer for DrawdownAnalyzer {
    fn name(&self) -> &'static str {
        "drawdown"
    }

    fn analyze(&self, input: &AnalyzerInput) -> Result<serde_json::Value, String> {
        if input.drawdown.is_empty() {
            return Ok(serde_json::json!({
                "name": self.name(),
                "max_drawdown": 0.0,
                "top": [],
            }));
        }
        if input.drawdown.len() != input.states.len() {
            return Err(format!(
                "drawdown series has {} points but there are {} states",
                input.drawdown.len(),
                input.states.len()
            ));
        }

        #[derive(Clone)]
        struct Episode {
            peak_day: usize,
            trough_day: usize,
            recovery_day: Option<usize>,
            depth: f64,
        }

        let mut episodes: Vec<Episode> = Vec::new();
        let mut current: Option<Episode> = None;

        for (day, dd) in input.drawdown.iter().copied().enumerate() {
            if dd.is_nan() {
                continue;
            }
            if dd >= 0.0 {
                if let Some(mut episode) = current.take() {
                    episode.recovery_day = Some(day);
                    episodes.push(episode);
                }
                continue;
            }
            match current.as_mut() {
                Some(episode) => {
                    if dd < episode.depth {
                        episode.depth = dd;
                        episode.trough_day = day;
                    }
                }
                None => {
                    current = Some(Episode {
                        peak_day: day.saturating_sub(1),
                        trough_day: day,
                        recovery_day: None,
                        depth: dd,
                    });
                }
            }
        }
        if let Some(episode) = current {
            episodes.push(episode);
        }

        episodes.sort_by(|a, b| {
            a.depth
                .partial_cmp(&b.depth)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let last_day = input.drawdown.len() - 1;
        let date_of = |day: usize| input.bars.get(day).and_then(|bar| bar.date);
        let top = episodes
            .into_iter()
            .take(self.top_n)
            .map(|e| {
                let end = e.recovery_day.unwrap_or(last_day);
                serde_json::json!({
                    "peak_day": e.peak_day,
                    "peak_date": date_of(e.peak_day),
                    "trough_day": e.trough_day,
                    "trough_date": date_of(e.trough_day),
                    "recovery_day": e.recovery_day,
                    "recovery_date": e.recovery_day.and_then(date_of),
                    "depth": e.depth,
                    "duration_days": end - e.peak_day,
                })
            })
            .collect::<Vec<_>>();

        Ok(serde_json::json!({
            "name": self.name(),
            "max_drawdown": input.summary.max_drawdown,
            "top": top,
        }))
    }
}
