//! Declarative registry mapping logical element names to ordered fallback
//! locator chains.
//!
//! The chain replaces a brittle single hard-coded path: each logical name
//! carries a primary CSS selector, an alternate structural (XPath) selector
//! and, where it makes sense, a text-content match as last resort. Markup
//! drift is tolerated by updating this registry, not the code above it.

use std::collections::BTreeMap;

use thiserror::Error;

use neptun_common::protocol::LocatorStrategy;

/// Logical element names used by the booking-portal crawler.
pub mod elements {
    pub const SUBSCRIPTION_INPUT: &str = "subscription-input";
    pub const SEARCH_BUTTON: &str = "search-button";
    pub const ERROR_BANNER: &str = "error-banner";
    pub const RESOURCE_BUTTON: &str = "resource-button";
    pub const RESERVATION_COUNTER: &str = "reservation-counter";
    pub const CALENDAR_TABLE: &str = "calendar-table";
    pub const CALENDAR_HEADER: &str = "calendar-header";
    pub const CALENDAR_DATE_CELL: &str = "calendar-date-cell";
    pub const NEXT_MONTH_ARROW: &str = "next-month-arrow";
    pub const SLOT_CARD: &str = "slot-card";
}

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("unknown element '{0}'")]
    UnknownElement(String),

    #[error("duplicate element name '{0}'")]
    DuplicateName(String),

    #[error("element '{0}' has no locator strategies")]
    EmptyStrategies(String),
}

/// A logical element: unique name plus its prioritized locator chain.
#[derive(Debug, Clone)]
pub struct ElementSpec {
    pub name: String,
    pub strategies: Vec<LocatorStrategy>,
    pub description: String,
}

impl ElementSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        strategies: Vec<LocatorStrategy>,
    ) -> Self {
        Self {
            name: name.into(),
            strategies,
            description: description.into(),
        }
    }
}

/// Process-wide, read-only lookup from logical name to [`ElementSpec`].
#[derive(Debug, Clone, Default)]
pub struct SelectorCatalog {
    specs: BTreeMap<String, ElementSpec>,
}

impl SelectorCatalog {
    /// Build a catalog from caller-supplied specs, rejecting duplicate
    /// names and empty strategy lists.
    pub fn from_specs(specs: Vec<ElementSpec>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for spec in specs {
            if spec.strategies.is_empty() {
                return Err(CatalogError::EmptyStrategies(spec.name));
            }
            if catalog.specs.contains_key(&spec.name) {
                return Err(CatalogError::DuplicateName(spec.name));
            }
            catalog.specs.insert(spec.name.clone(), spec);
        }
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Result<&ElementSpec, CatalogError> {
        self.specs
            .get(name)
            .ok_or_else(|| CatalogError::UnknownElement(name.to_string()))
    }

    /// All registered names, for diagnostics.
    pub fn names(&self) -> Vec<&str> {
        self.specs.keys().map(String::as_str).collect()
    }

    fn push(&mut self, spec: ElementSpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    /// The registry for the target booking portal.
    ///
    /// XPath alternates are the portal's historical absolute paths; they go
    /// stale first when the markup shifts, which is why the CSS selectors
    /// lead and a text match closes each chain where the on-page wording is
    /// stable.
    pub fn booking_portal() -> Self {
        let mut c = Self::default();

        c.push(ElementSpec::new(
            elements::SUBSCRIPTION_INPUT,
            "Subscription code entry field",
            vec![
                LocatorStrategy::css("form div input[type='text']"),
                LocatorStrategy::xpath(
                    "/html/body/div[1]/div/div/div[1]/div[2]/div/div/div/div/div[2]/div/div/div/form/div/input",
                ),
            ],
        ));

        c.push(ElementSpec::new(
            elements::SEARCH_BUTTON,
            "Submits the subscription code",
            vec![
                LocatorStrategy::css("form div div button"),
                LocatorStrategy::xpath(
                    "/html/body/div[1]/div/div/div[1]/div[2]/div/div/div/div/div[2]/div/div/div/form/div/div/button",
                ),
                LocatorStrategy::text_contains("Cauta"),
            ],
        ));

        c.push(ElementSpec::new(
            elements::ERROR_BANNER,
            "Banner shown for an unknown or expired subscription code",
            vec![
                LocatorStrategy::css(".alert-danger"),
                LocatorStrategy::xpath("//div[contains(@class, 'alert-danger')]"),
                LocatorStrategy::text_contains("nu a fost gasit"),
            ],
        ));

        c.push(ElementSpec::new(
            elements::RESOURCE_BUTTON,
            "Selects the bookable resource attached to the subscription",
            vec![
                LocatorStrategy::css("form > button"),
                LocatorStrategy::xpath(
                    "/html/body/div[1]/div/div/div[1]/div[2]/div/div/div/div/div[2]/div/div/div/form/button",
                ),
            ],
        ));

        c.push(ElementSpec::new(
            elements::RESERVATION_COUNTER,
            "Remaining-reservations counter on the resource button",
            vec![
                LocatorStrategy::css("form > button span:nth-of-type(2)"),
                LocatorStrategy::xpath(
                    "/html/body/div[1]/div/div/div[1]/div[2]/div/div/div/div/div[2]/div/div/div/form/button/span[2]",
                ),
            ],
        ));

        c.push(ElementSpec::new(
            elements::CALENDAR_TABLE,
            "Body of the booking calendar for the displayed month",
            vec![
                LocatorStrategy::css(".datepicker-days table tbody"),
                LocatorStrategy::xpath(
                    "/html/body/div[1]/div/div/div[1]/div[2]/div/div/div/div/div[2]/div/div/div/div/div/div[1]/table/tbody",
                ),
            ],
        ));

        c.push(ElementSpec::new(
            elements::CALENDAR_HEADER,
            "Month/year switch label above the calendar grid",
            vec![
                LocatorStrategy::css("th.datepicker-switch"),
                LocatorStrategy::xpath(
                    "/html/body/div[1]/div/div/div[1]/div[2]/div/div/div/div/div[2]/div/div/div/div/div/div[1]/table/thead/tr[2]/th[2]",
                ),
            ],
        ));

        c.push(ElementSpec::new(
            elements::CALENDAR_DATE_CELL,
            "One day cell in the calendar grid",
            vec![
                LocatorStrategy::css(".datepicker-days table tbody td"),
                LocatorStrategy::xpath(
                    "/html/body/div[1]/div/div/div[1]/div[2]/div/div/div/div/div[2]/div/div/div/div/div/div[1]/table/tbody//td",
                ),
            ],
        ));

        c.push(ElementSpec::new(
            elements::NEXT_MONTH_ARROW,
            "Advances the calendar one month",
            vec![
                LocatorStrategy::css("th.next"),
                LocatorStrategy::xpath(
                    "/html/body/div[1]/div/div/div[1]/div[2]/div/div/div/div/div[2]/div/div/div/div/div/div[1]/table/thead/tr[2]/th[3]",
                ),
                LocatorStrategy::text_contains("»"),
            ],
        ));

        c.push(ElementSpec::new(
            elements::SLOT_CARD,
            "One time-slot card for the selected date",
            vec![
                LocatorStrategy::css(".alert-outline-primary"),
                LocatorStrategy::xpath("//div[contains(@class, 'alert-outline-primary')]"),
            ],
        ));

        c
    }
}
