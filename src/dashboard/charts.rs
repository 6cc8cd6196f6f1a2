//! ECharts visualizations for the dashboard.
//!
//! Each chart is serialized as an ECharts option object and initialized by a script in the
//! page head.

use charming::{
    Chart,
    component::{Axis, Grid, Title},
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger},
    series::Bar,
};
use maud::{Markup, PreEscaped, html};

use crate::{dashboard::aggregation::CategoryTotal, html::HeadElement};

/// The script that provides the global `echarts` object.
pub(super) const ECHARTS_SCRIPT: &str = "/static/echarts.6.0.0.min.js";

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            @for chart in charts {
                div
                    id=(chart.id)
                    class="min-h-[380px] rounded dark:bg-gray-100"
                {}
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// A bar per category showing how much was spent in it.
pub(super) fn expenses_by_category_chart(breakdown: &[CategoryTotal]) -> Chart {
    let labels: Vec<String> = breakdown.iter().map(|total| total.name.clone()).collect();
    let values: Vec<f64> = breakdown.iter().map(|total| total.total).collect();

    Chart::new()
        .title(
            Title::new()
                .text("Расходы по категориям")
                .subtext("За всё время"),
        )
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Bar::new().name("Расходы").data(values))
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('ru-RU', {
              style: 'currency',
              currency: 'RUB',
              maximumFractionDigits: 0
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

#[cfg(test)]
mod chart_tests {
    use maud::PreEscaped;

    use crate::{dashboard::aggregation::CategoryTotal, html::HeadElement};

    use super::{DashboardChart, charts_script, expenses_by_category_chart};

    #[test]
    fn chart_contains_category_names_and_totals() {
        let breakdown = [
            CategoryTotal {
                name: "Продукты".to_owned(),
                total: 250.0,
            },
            CategoryTotal {
                name: "Кафе".to_owned(),
                total: 50.0,
            },
        ];

        let options = expenses_by_category_chart(&breakdown).to_string();

        assert!(options.contains("Продукты"), "got {options}");
        assert!(options.contains("Кафе"));
        assert!(options.contains("250"));
    }

    #[test]
    fn script_initializes_every_chart() {
        let charts = [DashboardChart {
            id: "expenses-chart",
            options: "{}".to_owned(),
        }];

        let HeadElement::ScriptSource(PreEscaped(script)) = charts_script(&charts) else {
            panic!("expected an inline script");
        };

        assert!(script.contains(r#"document.getElementById("expenses-chart")"#));
        assert!(script.starts_with("document.addEventListener('DOMContentLoaded'"));
    }
}
