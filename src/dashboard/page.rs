//! The dashboard route handler and view rendering.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::Session,
    budget::{BudgetProgress, budget_progress_item, list_budget_progress},
    dashboard::{
        aggregation::{Balance, UNCATEGORIZED_LABEL, balance, category_breakdown, recent},
        charts::{
            DashboardChart, ECHARTS_SCRIPT, charts_script, charts_view, expenses_by_category_chart,
        },
    },
    endpoints,
    html::{
        EXPENSE_TEXT_STYLE, INCOME_TEXT_STYLE, PAGE_CONTAINER_STYLE, HeadElement, base,
        currency_rounded_with_tooltip, link,
    },
    kind::Kind,
    month::Month,
    navigation::NavBar,
    timezone::{get_local_offset, local_today},
    transaction::{Transaction, TransactionFilter, list_transactions},
};

/// How many transactions the dashboard lists.
const RECENT_TRANSACTION_COUNT: usize = 5;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading transactions and budgets.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Moscow".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Display an overview of the current user's finances.
///
/// The balance, expense breakdown and recent transactions cover all of the user's
/// transactions. Budget progress is shown for the current month.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;
    let current_month = Month::containing(local_today(local_offset));

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions =
        list_transactions(session.user_id, &TransactionFilter::default(), &connection)
            .inspect_err(|error| tracing::error!("Could not get transactions: {error}"))?;
    let budgets = list_budget_progress(session.user_id, current_month, &connection)
        .inspect_err(|error| tracing::error!("Could not get budget progress: {error}"))?;
    drop(connection);

    Ok(dashboard_view(&session, current_month, &transactions, &budgets).into_response())
}

fn balance_card(title: &str, amount: f64, style: &str) -> Markup {
    html! {
        div class="p-4 bg-white dark:bg-gray-800 border border-gray-200
            dark:border-gray-700 rounded-lg shadow-md"
        {
            h3 class="text-sm text-gray-600 dark:text-gray-400" { (title) }
            p class={ "text-2xl font-bold " (style) } { (currency_rounded_with_tooltip(amount)) }
        }
    }
}

fn balance_cards_view(balance: Balance) -> Markup {
    let total = balance.total();
    let total_style = if total < 0.0 {
        EXPENSE_TEXT_STYLE
    } else {
        INCOME_TEXT_STYLE
    };

    html! {
        section id="balance" class="grid grid-cols-1 sm:grid-cols-3 gap-4 w-full"
        {
            (balance_card("Доходы", balance.income, INCOME_TEXT_STYLE))
            (balance_card("Расходы", balance.expense, EXPENSE_TEXT_STYLE))
            (balance_card("Баланс", total, total_style))
        }
    }
}

fn recent_transactions_view(transactions: &[&Transaction]) -> Markup {
    html! {
        section id="recent-transactions" class="w-full"
        {
            div class="flex justify-between items-baseline mb-4"
            {
                h3 class="text-xl font-semibold" { "Последние транзакции" }
                (link(endpoints::TRANSACTIONS_VIEW, "Все транзакции"))
            }

            ul class="divide-y divide-gray-200 dark:divide-gray-700"
            {
                @for transaction in transactions {
                    @let amount_style = match transaction.kind {
                        Kind::Income => INCOME_TEXT_STYLE,
                        Kind::Expense => EXPENSE_TEXT_STYLE,
                    };

                    li class="flex justify-between gap-4 py-2"
                    {
                        div
                        {
                            p class="font-medium"
                            {
                                (transaction.category_name.as_deref().unwrap_or(UNCATEGORIZED_LABEL))
                            }
                            p class="text-sm text-gray-600 dark:text-gray-400"
                            {
                                (transaction.date)
                                @if let Some(description) = &transaction.description {
                                    " · " (description)
                                }
                            }
                        }

                        span class=(amount_style)
                        {
                            (currency_rounded_with_tooltip(transaction.signed_amount()))
                        }
                    }
                }
            }
        }
    }
}

fn budget_progress_view(month: Month, budgets: &[BudgetProgress]) -> Markup {
    html! {
        section id="budget-progress" class="w-full"
        {
            div class="flex justify-between items-baseline mb-4"
            {
                h3 class="text-xl font-semibold" { "Бюджеты: " (month.label()) }
                (link(endpoints::BUDGETS_VIEW, "Настроить"))
            }

            @if budgets.is_empty() {
                p class="text-gray-600 dark:text-gray-400" { "Бюджеты на этот месяц не заданы." }
            } @else {
                ul class="space-y-4"
                {
                    @for progress in budgets {
                        (budget_progress_item(progress, false))
                    }
                }
            }
        }
    }
}

fn dashboard_no_data_view(nav_bar: Markup) -> Markup {
    let new_transaction_link = link(endpoints::NEW_TRANSACTION_VIEW, "добавьте первую транзакцию");

    let content = html!(
        (nav_bar)

        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold"
            {
                "Здесь пока пусто"
            }

            p
            {
                "Баланс и графики появятся, когда вы " (new_transaction_link) "."
            }
        }
    );

    base("Главная", &[], &content)
}

fn dashboard_view(
    session: &Session,
    month: Month,
    transactions: &[Transaction],
    budgets: &[BudgetProgress],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW, session).into_html();

    if transactions.is_empty() && budgets.is_empty() {
        return dashboard_no_data_view(nav_bar);
    }

    let breakdown = category_breakdown(transactions);
    let charts = if breakdown.is_empty() {
        Vec::new()
    } else {
        vec![DashboardChart {
            id: "expenses-chart",
            options: expenses_by_category_chart(&breakdown).to_string(),
        }]
    };
    let recent_transactions = recent(transactions, RECENT_TRANSACTION_COUNT);

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="flex flex-col gap-8 w-full max-w-screen-xl"
            {
                (balance_cards_view(balance(transactions)))

                @if !charts.is_empty() {
                    (charts_view(&charts))
                }

                div class="grid grid-cols-1 lg:grid-cols-2 gap-8"
                {
                    (recent_transactions_view(&recent_transactions))
                    (budget_progress_view(month, budgets))
                }
            }
        }
    );

    let scripts = if charts.is_empty() {
        Vec::new()
    } else {
        vec![
            HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned()),
            charts_script(&charts),
        ]
    };

    base("Главная", &scripts, &content)
}

#[cfg(test)]
mod dashboard_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use rusqlite::Connection;
    use scraper::{Html, Selector};
    use time::{Date, OffsetDateTime, macros::date};

    use crate::{
        auth::Session,
        budget::{NewBudget, upsert_budget},
        category::{Category, CategoryName, create_category},
        kind::Kind,
        month::Month,
        test_utils::{assert_valid_html, get_test_connection, insert_test_user, parse_html_document},
        transaction::{ValidatedTransaction, create_transaction},
    };

    use super::{DashboardState, get_dashboard_page};

    fn category(session: &Session, name: &str, kind: Kind, connection: &Connection) -> Category {
        create_category(
            session.user_id,
            CategoryName::new_unchecked(name),
            kind,
            connection,
        )
        .unwrap()
    }

    fn add_transaction(
        session: &Session,
        category: &Category,
        amount: f64,
        date: Date,
        connection: &Connection,
    ) {
        create_transaction(
            session.user_id,
            &ValidatedTransaction {
                category_id: category.id,
                amount,
                kind: category.kind,
                date,
                description: None,
            },
            connection,
        )
        .unwrap();
    }

    fn balance_text(html: &Html) -> String {
        let selector = Selector::parse("#balance > div:nth-child(3) p span").unwrap();

        html.select(&selector)
            .next()
            .expect("Could not find the balance")
            .text()
            .collect()
    }

    async fn render(connection: Connection, session: Session) -> Html {
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_dashboard_page(State(state), Extension(session))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        html
    }

    #[tokio::test]
    async fn shows_empty_state_without_data() {
        let connection = get_test_connection();
        let session = insert_test_user("a@x.com", &connection);

        let html = render(connection, session).await;

        assert!(html.select(&Selector::parse("#balance").unwrap()).next().is_none());
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Здесь пока пусто"));
    }

    #[tokio::test]
    async fn balance_ignores_other_users() {
        let connection = get_test_connection();
        let session = insert_test_user("a@x.com", &connection);
        let other = insert_test_user("b@x.com", &connection);
        let salary = category(&session, "Зарплата", Kind::Income, &connection);
        let groceries = category(&session, "Продукты", Kind::Expense, &connection);
        let other_salary = category(&other, "Зарплата", Kind::Income, &connection);
        add_transaction(&session, &salary, 1000.0, date!(2024 - 02 - 01), &connection);
        add_transaction(&session, &groceries, 300.0, date!(2024 - 02 - 02), &connection);
        add_transaction(&other, &other_salary, 99999.0, date!(2024 - 02 - 03), &connection);

        let html = render(connection, session).await;

        assert_eq!(balance_text(&html), "₽700");
    }

    #[tokio::test]
    async fn lists_five_most_recent_transactions_and_chart() {
        let connection = get_test_connection();
        let session = insert_test_user("a@x.com", &connection);
        let groceries = category(&session, "Продукты", Kind::Expense, &connection);
        for day in 1..=7 {
            add_transaction(
                &session,
                &groceries,
                f64::from(day),
                Date::from_calendar_date(2024, time::Month::February, day).unwrap(),
                &connection,
            );
        }

        let html = render(connection, session).await;

        let items = html
            .select(&Selector::parse("#recent-transactions li").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(items.len(), 5);
        let first = items[0].text().collect::<String>();
        assert!(first.contains("2024-02-07"), "got {first:?}");
        assert!(
            html.select(&Selector::parse("#expenses-chart").unwrap())
                .next()
                .is_some()
        );
    }

    #[tokio::test]
    async fn shows_budget_progress_for_current_month() {
        let connection = get_test_connection();
        let session = insert_test_user("a@x.com", &connection);
        let groceries = category(&session, "Продукты", Kind::Expense, &connection);
        let today = OffsetDateTime::now_utc().date();
        add_transaction(&session, &groceries, 250.0, today, &connection);
        upsert_budget(
            session.user_id,
            &NewBudget {
                category_id: groceries.id,
                month: Month::containing(today),
                limit_amount: 1000.0,
            },
            &connection,
        )
        .unwrap();

        let html = render(connection, session).await;

        let item = html
            .select(&Selector::parse("#budget-progress li").unwrap())
            .next()
            .expect("Could not find budget progress");
        let text = item.text().collect::<String>();
        assert!(text.contains("(25%)"), "got {text:?}");
        assert!(
            item.select(&Selector::parse("button[hx-delete]").unwrap())
                .next()
                .is_none()
        );
    }
}

#[cfg(test)]
mod dashboard_scenario_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        auth::{Email, SQLiteIdentityProvider, ValidatedPassword, register_account},
        budget::{NewBudget, list_budget_progress, upsert_budget},
        category::list_categories,
        dashboard::aggregation::balance,
        db::initialize,
        kind::Kind,
        month::Month,
        transaction::{TransactionFilter, ValidatedTransaction, create_transaction, list_transactions},
    };

    #[test]
    fn register_spend_and_budget() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let provider =
            SQLiteIdentityProvider::new(Connection::open_in_memory().unwrap(), 4).unwrap();

        let user = register_account(
            &Email::new("a@x.com").unwrap(),
            ValidatedPassword::new_unchecked("averylongandsecurepassword"),
            4,
            &provider,
            &connection,
        )
        .unwrap();

        let categories = list_categories(user.id, None, &connection).unwrap();
        assert_eq!(categories.len(), 10);
        assert_eq!(
            categories
                .iter()
                .filter(|category| category.kind == Kind::Expense)
                .count(),
            6
        );
        let groceries = categories
            .iter()
            .find(|category| category.kind == Kind::Expense && category.name.as_ref() == "Продукты")
            .expect("Could not find the groceries category");

        create_transaction(
            user.id,
            &ValidatedTransaction {
                category_id: groceries.id,
                amount: 500.0,
                kind: Kind::Expense,
                date: date!(2024 - 02 - 10),
                description: None,
            },
            &connection,
        )
        .unwrap();
        let transactions =
            list_transactions(user.id, &TransactionFilter::default(), &connection).unwrap();
        assert_eq!(balance(&transactions).total(), -500.0);

        let february: Month = "2024-02".parse().unwrap();
        upsert_budget(
            user.id,
            &NewBudget {
                category_id: groceries.id,
                month: february,
                limit_amount: 1000.0,
            },
            &connection,
        )
        .unwrap();
        let progress = list_budget_progress(user.id, february, &connection).unwrap();
        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].utilization(), 50);
    }
}
