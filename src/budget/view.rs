//! Progress bars for budgets, shared by the budgets page and the dashboard.

use maud::{Markup, html};

use crate::{
    budget::{BudgetProgress, BudgetStatus},
    endpoints,
    html::{BUTTON_DELETE_STYLE, format_currency_rounded},
};

/// Renders a horizontal bar filled to `utilization` percent in the colour of `status`.
fn progress_bar(utilization: u8, status: BudgetStatus) -> Markup {
    // Ensure minimum 3% width so rounded corners are visible
    let display_percentage = match utilization {
        0 => 0,
        1..3 => 3,
        other => other,
    };

    html! {
        div
            class="w-full bg-gray-200 dark:bg-gray-700 rounded-full h-2.5"
            role="progressbar"
            aria-valuenow=(utilization)
            aria-valuemin="0"
            aria-valuemax="100"
        {
            @if utilization > 0 {
                div
                    class={ "h-2.5 rounded-full transition-all " (status.bar_style()) }
                    style=(format!("width: {display_percentage}%"))
                {}
            }
        }
    }
}

/// One budget with its spending, limit and progress bar.
///
/// A delete button is shown when `deletable` is true.
pub fn budget_progress_item(progress: &BudgetProgress, deletable: bool) -> Markup {
    let utilization = progress.utilization();
    let status = progress.status();
    let delete_url = endpoints::format_endpoint(endpoints::BUDGET, progress.budget.id);
    let confirm_message = format!(
        "Удалить бюджет для категории «{}»?",
        progress.budget.category_name
    );

    html! {
        li class="space-y-1"
        {
            div class="flex justify-between items-baseline gap-4 text-sm"
            {
                span class="font-medium text-gray-900 dark:text-white"
                {
                    (progress.budget.category_name)
                }

                span class="text-gray-600 dark:text-gray-400"
                {
                    (format_currency_rounded(progress.spent))
                    " / "
                    (format_currency_rounded(progress.budget.limit_amount))
                    " (" (utilization) "%)"

                    @if status == BudgetStatus::Over {
                        " "
                        span class="font-semibold text-red-600 dark:text-red-400" { "(Превышение!)" }
                    }
                }
            }

            (progress_bar(utilization, status))

            @if deletable {
                div class="text-right"
                {
                    button
                        type="button"
                        hx-delete=(delete_url)
                        hx-confirm=(confirm_message)
                        hx-target="closest li"
                        hx-target-error="#alert-container"
                        hx-swap="outerHTML swap:0.5s"
                        class=(BUTTON_DELETE_STYLE)
                    {
                        "Удалить"
                    }
                }
            }
        }
    }
}
