use clap::Subcommand;
use lunchly_core::domain::customer::{Customer, CustomerId};
use lunchly_core::domain::reservation::Reservation;
use lunchly_core::errors::{ApplicationError, InterfaceError};
use lunchly_db::{CustomerRepository, RepositoryError, SqlCustomerRepository};
use serde::Serialize;
use tracing::{info, warn};

use crate::commands::{correlation_id, with_database, CommandResult, StepFailure};

#[derive(Debug, Clone, Subcommand)]
pub enum CustomerCommand {
    #[command(about = "List every customer ordered by last name, then first name")]
    List,
    #[command(about = "Show a single customer by id")]
    Show {
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
    #[command(about = "Case-insensitive search on first or last name")]
    Search { name: String },
    #[command(about = "Rank customers by reservation count")]
    Top {
        #[arg(default_value_t = 10)]
        n: u32,
    },
    #[command(about = "Create a customer")]
    Add {
        first_name: String,
        last_name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    #[command(about = "List a customer's reservations")]
    Reservations {
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
}

impl CustomerCommand {
    pub fn command_name(&self) -> &'static str {
        match self {
            Self::List => "customers.list",
            Self::Show { .. } => "customers.show",
            Self::Search { .. } => "customers.search",
            Self::Top { .. } => "customers.top",
            Self::Add { .. } => "customers.add",
            Self::Reservations { .. } => "customers.reservations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerView {
    pub id: Option<CustomerId>,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl From<Customer> for CustomerView {
    fn from(customer: Customer) -> Self {
        let full_name = customer.full_name();
        Self {
            id: customer.id,
            first_name: customer.first_name,
            last_name: customer.last_name,
            full_name,
            phone: customer.phone,
            notes: customer.notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandData {
    Customers(Vec<CustomerView>),
    Customer(CustomerView),
    Reservations(Vec<Reservation>),
}

pub fn run(action: CustomerCommand) -> CommandResult {
    let command = action.command_name();

    let result = with_database(command, |pool| async move {
        let repository = SqlCustomerRepository::with_sql_reservations(pool);
        execute(&repository, action).await.map_err(|error| repository_failure(command, error))
    });

    match result {
        Ok((message, data)) => CommandResult::success_with_data(command, message, data),
        Err(failure) => failure,
    }
}

/// Runs one customer action against any repository implementation.
pub async fn execute(
    repository: &dyn CustomerRepository,
    action: CustomerCommand,
) -> Result<(String, CommandData), RepositoryError> {
    match action {
        CustomerCommand::List => {
            let customers = repository.list_all().await?;
            Ok((format!("{} customers", customers.len()), customers_data(customers)))
        }
        CustomerCommand::Show { id } => {
            let customer = repository.get_by_id(&CustomerId(id)).await?;
            Ok((customer.full_name(), CommandData::Customer(customer.into())))
        }
        CustomerCommand::Search { name } => {
            let customers = repository.search_by_name(&name).await?;
            Ok((
                format!("{} customers matching {name:?}", customers.len()),
                customers_data(customers),
            ))
        }
        CustomerCommand::Top { n } => {
            let customers = repository.top_n(n).await?;
            Ok((format!("top {} customers", customers.len()), customers_data(customers)))
        }
        CustomerCommand::Add { first_name, last_name, phone, notes } => {
            let mut customer = Customer::new(first_name, last_name);
            customer.phone = phone;
            customer.notes = notes;

            let saved = repository.save(customer).await?;
            info!(
                event_name = "cli.customers.added",
                customer_id = saved.id.map(|id| id.0),
                "customer added"
            );
            Ok((format!("added {}", saved.full_name()), CommandData::Customer(saved.into())))
        }
        CustomerCommand::Reservations { id } => {
            let customer = repository.get_by_id(&CustomerId(id)).await?;
            let reservations = repository.reservations(&customer).await?;
            Ok((
                format!("{} reservations for {}", reservations.len(), customer.full_name()),
                CommandData::Reservations(reservations),
            ))
        }
    }
}

fn customers_data(customers: Vec<Customer>) -> CommandData {
    CommandData::Customers(customers.into_iter().map(CustomerView::from).collect())
}

fn repository_failure(command: &str, error: RepositoryError) -> StepFailure {
    let interface = ApplicationError::from(error).into_interface(correlation_id(command));
    match interface {
        InterfaceError::NotFound { .. } => StepFailure::from_interface("not_found", interface, 6),
        _ => {
            warn!(
                event_name = "cli.customers.query_failed",
                correlation_id = interface.correlation_id(),
                detail = interface.detail(),
                "customer query failed"
            );
            StepFailure::from_interface("query", interface, 7)
        }
    }
}
