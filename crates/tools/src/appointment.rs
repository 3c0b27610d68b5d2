//! Appointment booking and availability tools

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

use omniline_persistence::{
    Appointment, AppointmentStatus, AppointmentStore, ProspectStore,
};

use crate::catalog::{number_arg, string_arg};
use crate::schema::{
    InputSchema, PropertySchema, Tool, ToolContext, ToolError, ToolOutput, ToolSchema,
};

/// Bookable day: half-hour slots from opening to closing.
const OPENING_HOUR: u32 = 9;
const CLOSING_HOUR: u32 = 18;
const SLOT_MINUTES: u32 = 30;

const DEFAULT_DURATION_MINUTES: u32 = 30;
/// "Demain 14h": what callers mean when they say "dès que possible".
const DEFAULT_HOUR: u32 = 14;

fn default_date() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(1)
}

fn parse_date(args: &Value) -> Result<NaiveDate, ToolOutput> {
    match string_arg(args, "date") {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            ToolOutput::error(format!(
                "Date invalide '{raw}', format attendu AAAA-MM-JJ."
            ))
        }),
        None => Ok(default_date()),
    }
}

pub struct BookAppointmentTool {
    appointments: Arc<dyn AppointmentStore>,
    prospects: Arc<dyn ProspectStore>,
}

impl BookAppointmentTool {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        prospects: Arc<dyn ProspectStore>,
    ) -> Self {
        Self {
            appointments,
            prospects,
        }
    }
}

#[async_trait]
impl Tool for BookAppointmentTool {
    fn name(&self) -> &str {
        "book_appointment"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "book_appointment".into(),
            description: "Réserver un rendez-vous pour le client. Sans date ni heure, \
                          le créneau par défaut est demain à 14h."
                .into(),
            input_schema: InputSchema::object()
                .property(
                    "customer_name",
                    PropertySchema::string("Nom complet du client"),
                    true,
                )
                .property(
                    "customer_phone",
                    PropertySchema::string("Téléphone du client (défaut: numéro appelant)"),
                    false,
                )
                .property(
                    "date",
                    PropertySchema::string("Date du rendez-vous, format AAAA-MM-JJ"),
                    false,
                )
                .property(
                    "time",
                    PropertySchema::string("Heure du rendez-vous, format HH:MM"),
                    false,
                )
                .property(
                    "duration_minutes",
                    PropertySchema::integer("Durée en minutes").with_range(15.0, 240.0),
                    false,
                )
                .property(
                    "service_type",
                    PropertySchema::string("Type de prestation (visite, appel, conseil)"),
                    false,
                )
                .property("notes", PropertySchema::string("Notes libres"), false),
        }
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let customer_name = string_arg(&args, "customer_name")
            .ok_or_else(|| ToolError::invalid_params("Missing required field: customer_name"))?;
        let customer_phone =
            string_arg(&args, "customer_phone").unwrap_or_else(|| ctx.caller.clone());

        let date = match parse_date(&args) {
            Ok(date) => date,
            Err(output) => return Ok(output),
        };
        let time = match string_arg(&args, "time") {
            Some(raw) => match NaiveTime::parse_from_str(&raw, "%H:%M") {
                Ok(time) => time,
                Err(_) => {
                    return Ok(ToolOutput::error(format!(
                        "Heure invalide '{raw}', format attendu HH:MM."
                    )));
                }
            },
            None => NaiveTime::from_hms_opt(DEFAULT_HOUR, 0, 0).unwrap_or_default(),
        };

        let scheduled_at = NaiveDateTime::new(date, time);
        let duration_minutes = number_arg(&args, "duration_minutes")
            .map(|n| n as u32)
            .unwrap_or(DEFAULT_DURATION_MINUTES);
        let service_type =
            string_arg(&args, "service_type").unwrap_or_else(|| "rendez-vous".to_string());
        let notes = string_arg(&args, "notes").unwrap_or_default();

        let prospect = match self
            .prospects
            .resolve_or_create(&ctx.tenant_id, &customer_phone, Some(&customer_name))
            .await
        {
            Ok(prospect) => prospect,
            Err(err) => {
                tracing::warn!(
                    conversation_id = %ctx.conversation_id,
                    error = %err,
                    "prospect resolution failed"
                );
                return Ok(ToolOutput::error(
                    "La réservation n'a pas pu être enregistrée, veuillez réessayer.",
                ));
            }
        };

        let appointment = Appointment {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: ctx.tenant_id.clone(),
            conversation_id: ctx.conversation_id.clone(),
            prospect_id: prospect.id,
            customer_name,
            customer_phone,
            scheduled_at,
            duration_minutes,
            service_type,
            notes,
            status: AppointmentStatus::Scheduled,
            created_at: Utc::now(),
        };

        match self.appointments.create_idempotent(appointment).await {
            Ok(saved) => {
                // Short management reference for follow-up calls.
                let reference: String = saved.id.chars().take(8).collect();
                Ok(ToolOutput::text(format!(
                    "Rendez-vous confirmé pour {} le {} à {}. Référence {}.",
                    saved.customer_name,
                    saved.scheduled_at.format("%d/%m/%Y"),
                    saved.scheduled_at.format("%H:%M"),
                    reference,
                )))
            }
            Err(err) => {
                tracing::warn!(
                    conversation_id = %ctx.conversation_id,
                    error = %err,
                    "appointment booking failed"
                );
                Ok(ToolOutput::error(
                    "La réservation n'a pas pu être enregistrée, veuillez réessayer.",
                ))
            }
        }
    }
}

pub struct CheckAvailabilityTool {
    appointments: Arc<dyn AppointmentStore>,
}

impl CheckAvailabilityTool {
    pub fn new(appointments: Arc<dyn AppointmentStore>) -> Self {
        Self { appointments }
    }
}

#[async_trait]
impl Tool for CheckAvailabilityTool {
    fn name(&self) -> &str {
        "check_availability"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "check_availability".into(),
            description: "Lister les créneaux encore libres pour une date donnée \
                          (défaut: demain)."
                .into(),
            input_schema: InputSchema::object().property(
                "date",
                PropertySchema::string("Date à vérifier, format AAAA-MM-JJ"),
                false,
            ),
        }
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let date = match parse_date(&args) {
            Ok(date) => date,
            Err(output) => return Ok(output),
        };

        let booked = match self.appointments.booked_times(&ctx.tenant_id, date).await {
            Ok(times) => times,
            Err(err) => {
                tracing::warn!(
                    conversation_id = %ctx.conversation_id,
                    error = %err,
                    "availability lookup failed"
                );
                return Ok(ToolOutput::error(
                    "Impossible de consulter les disponibilités pour le moment.",
                ));
            }
        };

        let free: Vec<String> = day_slots()
            .filter(|slot| !booked.contains(slot))
            .map(|slot| slot.format("%H:%M").to_string())
            .collect();

        if free.is_empty() {
            return Ok(ToolOutput::text(format!(
                "Aucun créneau libre le {}.",
                date.format("%d/%m/%Y")
            )));
        }

        Ok(ToolOutput::text(format!(
            "Créneaux libres le {} : {}",
            date.format("%d/%m/%Y"),
            free.join(", "),
        )))
    }
}

/// Half-hour slots from opening to the last slot before closing.
fn day_slots() -> impl Iterator<Item = NaiveTime> {
    (OPENING_HOUR * 60..CLOSING_HOUR * 60)
        .step_by(SLOT_MINUTES as usize)
        .filter_map(|minutes| NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniline_persistence::MemoryStore;
    use serde_json::json;

    fn ctx() -> ToolContext {
        ToolContext {
            tenant_id: "tenant-1".into(),
            conversation_id: "conv-1".into(),
            caller: "+33612345678".into(),
        }
    }

    #[test]
    fn test_day_has_eighteen_slots() {
        let slots: Vec<_> = day_slots().collect();
        assert_eq!(slots.len(), 18);
        assert_eq!(slots[0], NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(*slots.last().unwrap(), NaiveTime::from_hms_opt(17, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn test_booking_defaults_to_tomorrow_afternoon() {
        let store = MemoryStore::new();
        let tool = BookAppointmentTool::new(store.clone(), store.clone());

        let output = tool
            .execute(&ctx(), json!({"customer_name": "Jean Dupont"}))
            .await
            .unwrap();
        assert!(!output.is_error);
        assert!(output.first_text().unwrap().contains("Référence"));

        let expected = NaiveDateTime::new(
            default_date(),
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        );
        let booked = store.booked_times("tenant-1", expected.date()).await.unwrap();
        assert_eq!(booked, vec![expected.time()]);
    }

    #[tokio::test]
    async fn test_rebooking_same_slot_is_idempotent() {
        let store = MemoryStore::new();
        let tool = BookAppointmentTool::new(store.clone(), store.clone());
        let args = json!({
            "customer_name": "Jean Dupont",
            "date": "2026-09-15",
            "time": "10:00",
        });

        tool.execute(&ctx(), args.clone()).await.unwrap();
        tool.execute(&ctx(), args).await.unwrap();

        assert_eq!(store.appointment_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_date_is_an_error_output() {
        let store = MemoryStore::new();
        let tool = BookAppointmentTool::new(store.clone(), store);

        let output = tool
            .execute(
                &ctx(),
                json!({"customer_name": "Jean", "date": "demain"}),
            )
            .await
            .unwrap();
        assert!(output.is_error);
        assert!(output.first_text().unwrap().contains("Date invalide"));
    }

    #[tokio::test]
    async fn test_store_failure_is_an_apology_not_an_err() {
        let store = MemoryStore::new();
        store.fail_writes_with("db down");
        let tool = BookAppointmentTool::new(store.clone(), store);

        let output = tool
            .execute(&ctx(), json!({"customer_name": "Jean"}))
            .await
            .unwrap();
        assert!(output.is_error);
    }

    #[tokio::test]
    async fn test_availability_excludes_booked_slots() {
        let store = MemoryStore::new();
        let booker = BookAppointmentTool::new(store.clone(), store.clone());
        booker
            .execute(
                &ctx(),
                json!({
                    "customer_name": "Jean",
                    "date": "2026-09-15",
                    "time": "10:00",
                }),
            )
            .await
            .unwrap();

        let checker = CheckAvailabilityTool::new(store);
        let output = checker
            .execute(&ctx(), json!({"date": "2026-09-15"}))
            .await
            .unwrap();
        let text = output.first_text().unwrap();
        assert!(!text.contains("10:00"));
        assert!(text.contains("10:30"));
        assert!(text.contains("09:00"));
    }
}
