//! CSV export of claimed tickets.

use crate::error::{RaffleError, Result};
use crate::types::{Raffle, Ticket, TicketStatus};

/// Header row of the export, in column order
pub const CSV_HEADER: [&str; 5] = ["Número", "Nombre", "Teléfono", "Email", "Estado"];

/// Writes one row per reserved or sold ticket, ascending by number.
///
/// # Errors
///
/// Returns [`RaffleError::Export`] if the writer fails.
pub fn tickets_to_csv(tickets: &[Ticket]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(export_error)?;

    for ticket in tickets
        .iter()
        .filter(|ticket| ticket.status() != TicketStatus::Available)
    {
        let (name, phone, email) = ticket.buyer().map_or(("", "", ""), |buyer| {
            (
                buyer.name.as_str(),
                buyer.phone.as_str(),
                buyer.email.as_deref().unwrap_or(""),
            )
        });
        writer
            .write_record([
                ticket.number().to_string().as_str(),
                name,
                phone,
                email,
                ticket.status().label(),
            ])
            .map_err(export_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| RaffleError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| RaffleError::Export(e.to_string()))
}

/// Download name for a raffle's export
#[must_use]
pub fn csv_file_name(raffle: &Raffle) -> String {
    let title: String = raffle
        .title
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    format!("sorteo-{title}-numeros.csv")
}

#[allow(clippy::needless_pass_by_value)] // used as a map_err adapter
fn export_error(error: csv::Error) -> RaffleError {
    RaffleError::Export(error.to_string())
}
