//! The form shared by the new and edit transaction pages.

use maud::{Markup, html};
use time::Date;

use crate::{
    category::{Category, CategoryId, category_options_view},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_ERROR_STYLE, FORM_LABEL_STYLE, FORM_RADIO_GROUP_STYLE,
        FORM_RADIO_INPUT_STYLE, FORM_RADIO_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, loading_spinner,
    },
    kind::Kind,
};

/// How the form is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FormAction<'a> {
    Create,
    Update(&'a str),
}

/// The values the form is pre-filled with.
pub(super) struct TransactionFormDefaults<'a> {
    pub kind: Kind,
    pub category_id: Option<CategoryId>,
    pub amount: Option<f64>,
    pub date: Date,
    pub description: Option<&'a str>,
}

/// Render the transaction form.
///
/// `categories` should only contain categories of `defaults.kind`. Changing the kind
/// reloads the category options for the new kind.
pub(super) fn transaction_form_view(
    action: FormAction<'_>,
    defaults: &TransactionFormDefaults<'_>,
    categories: &[Category],
    error_message: &str,
) -> Markup {
    let amount_str = defaults.amount.map(|amount| format!("{amount:.2}"));
    let submit_label = match action {
        FormAction::Create => "Добавить",
        FormAction::Update(_) => "Сохранить",
    };

    let kind_radio = |kind: Kind| {
        let id = format!("kind-{kind}");

        html! {
            div class="flex items-center gap-3"
            {
                input
                    name="kind"
                    id=(id)
                    type="radio"
                    value=(kind)
                    checked[kind == defaults.kind]
                    required
                    hx-get=(endpoints::CATEGORY_OPTIONS)
                    hx-target="#category_id"
                    hx-swap="innerHTML"
                    hx-trigger="change"
                    class=(FORM_RADIO_INPUT_STYLE);

                label
                    for=(id)
                    class=(FORM_RADIO_LABEL_STYLE)
                {
                    (kind.label())
                }
            }
        }
    };

    let fields = html! {
        fieldset class="space-y-2"
        {
            legend class=(FORM_LABEL_STYLE) { "Тип операции" }

            div class=(FORM_RADIO_GROUP_STYLE)
            {
                (kind_radio(Kind::Expense))
                (kind_radio(Kind::Income))
            }
        }

        div
        {
            label
                for="category_id"
                class=(FORM_LABEL_STYLE)
            {
                "Категория"
            }

            select
                name="category_id"
                id="category_id"
                required
                class=(FORM_TEXT_INPUT_STYLE)
            {
                (category_options_view(categories, defaults.category_id))
            }
        }

        div
        {
            label
                for="amount"
                class=(FORM_LABEL_STYLE)
            {
                "Сумма"
            }

            input
                name="amount"
                id="amount"
                type="number"
                step="0.01"
                min="0"
                placeholder="0.00"
                required
                autofocus
                value=[amount_str.as_deref()]
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="date"
                class=(FORM_LABEL_STYLE)
            {
                "Дата"
            }

            input
                name="date"
                id="date"
                type="date"
                value=(defaults.date)
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="description"
                class=(FORM_LABEL_STYLE)
            {
                "Описание"
            }

            input
                name="description"
                id="description"
                type="text"
                placeholder="Необязательно"
                value=[defaults.description]
                class=(FORM_TEXT_INPUT_STYLE);
        }

        @if !error_message.is_empty() {
            p class=(FORM_ERROR_STYLE)
            {
                (error_message)
            }
        }

        button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
        {
            span id="indicator" class="inline htmx-indicator"
            {
                (loading_spinner())
            }
            " " (submit_label)
        }
    };

    match action {
        FormAction::Create => html! {
            form
                hx-post=(endpoints::TRANSACTIONS_API)
                hx-target-error="#alert-container"
                hx-swap="outerHTML"
                class="w-full space-y-4 md:space-y-6"
            {
                (fields)
            }
        },
        FormAction::Update(endpoint) => html! {
            form
                hx-put=(endpoint)
                hx-target-error="#alert-container"
                hx-swap="outerHTML"
                class="w-full space-y-4 md:space-y-6"
            {
                (fields)
            }
        },
    }
}

#[cfg(test)]
mod transaction_form_view_tests {
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::{endpoints, kind::Kind, test_utils::must_get_form};

    use super::{FormAction, TransactionFormDefaults, transaction_form_view};

    fn render(kind: Kind, error_message: &str) -> Html {
        let markup = transaction_form_view(
            FormAction::Create,
            &TransactionFormDefaults {
                kind,
                category_id: None,
                amount: None,
                date: date!(2024 - 02 - 10),
                description: None,
            },
            &[],
            error_message,
        );

        Html::parse_fragment(&markup.into_string())
    }

    #[test]
    fn checks_selected_kind() {
        for (kind, want) in [(Kind::Expense, "expense"), (Kind::Income, "income")] {
            let html = render(kind, "");
            let checked = html
                .select(&Selector::parse("input[type=radio][name=kind][checked]").unwrap())
                .filter_map(|input| input.value().attr("value"))
                .collect::<Vec<_>>();

            assert_eq!(checked, vec![want]);
        }
    }

    #[test]
    fn kind_change_reloads_category_options() {
        let html = render(Kind::Expense, "");

        for radio in html.select(&Selector::parse("input[type=radio][name=kind]").unwrap()) {
            assert_eq!(
                radio.value().attr("hx-get"),
                Some(endpoints::CATEGORY_OPTIONS)
            );
            assert_eq!(radio.value().attr("hx-target"), Some("#category_id"));
        }
    }

    #[test]
    fn date_defaults_to_given_day() {
        let html = render(Kind::Expense, "");
        let form = must_get_form(&html);

        let date = form
            .select(&Selector::parse("input[name=date]").unwrap())
            .next()
            .unwrap();
        assert_eq!(date.value().attr("value"), Some("2024-02-10"));
    }

    #[test]
    fn error_message_is_shown() {
        let html = render(Kind::Expense, "Сумма должна быть неотрицательным числом");
        let form = must_get_form(&html);

        crate::test_utils::assert_form_error_message(
            &form,
            "Сумма должна быть неотрицательным числом",
        );
    }
}
