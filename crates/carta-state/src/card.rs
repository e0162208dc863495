use carta_api::{ClientCard, StorefrontApi, VirtualCardRequest};
use carta_core::{CartaError, CartaResult};
use carta_store::Session;

pub const MIN_CARD_DIGITS: usize = 6;

pub fn normalize_card_number(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < MIN_CARD_DIGITS {
        None
    } else {
        Some(digits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Saved,
    Ignored,
}

// A camera feed fires the scan callback many times per physical gesture;
// the gate consumes each code at most once.
#[derive(Debug)]
pub struct ScanGate {
    armed: bool,
    in_flight: bool,
}

impl ScanGate {
    pub fn new() -> Self {
        Self {
            armed: true,
            in_flight: false,
        }
    }

    pub fn try_consume(&mut self) -> bool {
        if !self.armed || self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    pub fn complete(&mut self, accepted: bool) {
        self.in_flight = false;
        self.armed = !accepted;
    }

    pub fn rearm(&mut self) {
        if !self.in_flight {
            self.armed = true;
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed && !self.in_flight
    }
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CardManager {
    api: StorefrontApi,
    card: Option<ClientCard>,
    virtual_available: bool,
    virtual_ccnum: Option<String>,
    saving: bool,
    gate: ScanGate,
}

impl CardManager {
    pub fn new(api: StorefrontApi) -> Self {
        Self {
            api,
            card: None,
            virtual_available: false,
            virtual_ccnum: None,
            saving: false,
            gate: ScanGate::new(),
        }
    }

    pub fn card(&self) -> Option<&ClientCard> {
        self.card.as_ref()
    }

    pub fn virtual_available(&self) -> bool {
        self.virtual_available
    }

    pub fn virtual_ccnum(&self) -> Option<&str> {
        self.virtual_ccnum.as_deref()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn scanner_armed(&self) -> bool {
        self.gate.is_armed()
    }

    pub fn load(&mut self, session: &Session) -> CartaResult<()> {
        if !session.is_authenticated() {
            return Ok(());
        }

        match self.api.client_cards(session.token()) {
            Ok(data) => {
                self.card = data.card;
                self.virtual_available = data.virtual_available;
                self.virtual_ccnum = data.virtual_ccnum;
                Ok(())
            }
            Err(err) => {
                tracing::debug!(error = %err, "client card load failed");
                Err(CartaError::api("failed to load the client card"))
            }
        }
    }

    pub fn handle_scan(&mut self, session: &Session, code: &str) -> CartaResult<ScanOutcome> {
        if self.saving || !self.gate.try_consume() {
            return Ok(ScanOutcome::Ignored);
        }

        match self.save_card_inner(session, code) {
            Ok(()) => {
                self.gate.complete(true);
                Ok(ScanOutcome::Saved)
            }
            Err(err) => {
                self.gate.complete(false);
                Err(err)
            }
        }
    }

    pub fn rearm_scanner(&mut self) {
        self.gate.rearm();
    }

    pub fn save_card(&mut self, session: &Session, raw: &str) -> CartaResult<()> {
        self.save_card_inner(session, raw)
    }

    pub fn remove_card(&mut self, session: &Session) -> CartaResult<()> {
        if let Err(err) = self.api.remove_card(session.token()) {
            tracing::debug!(error = %err, "client card removal failed");
            return Err(CartaError::api("failed to remove the client card"));
        }

        self.card = None;
        Ok(())
    }

    pub fn existing_virtual(&self, session: &Session) -> Option<String> {
        match self.api.client_cards(session.token()) {
            Ok(data) if data.virtual_available => data.virtual_ccnum,
            _ => None,
        }
    }

    pub fn create_virtual(
        &mut self,
        session: &Session,
        form: &VirtualCardRequest,
    ) -> CartaResult<Option<String>> {
        validate_virtual_form(form)?;

        let data = self.api.create_virtual_card(session.token(), form)?;
        let Some(ccnum) = data.issued_ccnum().map(str::to_string) else {
            return Ok(None);
        };

        self.save_card_inner(session, &ccnum)?;
        Ok(Some(ccnum))
    }

    fn save_card_inner(&mut self, session: &Session, raw: &str) -> CartaResult<()> {
        let Some(ccnum) = normalize_card_number(raw) else {
            return Err(CartaError::usage(format!(
                "card number must contain at least {MIN_CARD_DIGITS} digits"
            )));
        };

        self.saving = true;
        let result = self.api.set_card(session.token(), &ccnum);
        self.saving = false;

        let data = result?;
        self.card = data.card.or(Some(ClientCard { ccnum }));

        // A failed hint refresh must not undo the completed save.
        if let Err(err) = self.load(session) {
            tracing::warn!(error = %err, "card refresh after save failed");
        }

        Ok(())
    }
}

fn only_digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

fn plausible_email(input: &str) -> bool {
    let trimmed = input.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

fn validate_virtual_form(form: &VirtualCardRequest) -> CartaResult<()> {
    if form.first_name.trim().chars().count() < 2 {
        return Err(CartaError::usage("first name is required"));
    }
    if form.middle_name.trim().chars().count() < 2 {
        return Err(CartaError::usage("middle name is required"));
    }
    if form.last_name.trim().chars().count() < 2 {
        return Err(CartaError::usage("last name is required"));
    }
    if only_digits(&form.egn).len() != 10 {
        return Err(CartaError::usage("EGN must contain exactly 10 digits"));
    }
    if only_digits(&form.post_code).len() != 4 {
        return Err(CartaError::usage("post code must contain exactly 4 digits"));
    }
    if only_digits(&form.phone).len() < 8 {
        return Err(CartaError::usage("phone must contain at least 8 digits"));
    }
    if !plausible_email(&form.email) {
        return Err(CartaError::usage("a valid email address is required"));
    }
    if !form.consent {
        return Err(CartaError::usage(
            "consent is required to create a virtual card",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_separators() {
        assert_eq!(normalize_card_number("12-34 56").as_deref(), Some("123456"));
        assert_eq!(
            normalize_card_number("1234567890123").as_deref(),
            Some("1234567890123")
        );
    }

    #[test]
    fn normalization_rejects_short_inputs() {
        assert_eq!(normalize_card_number("12a3"), None);
        assert_eq!(normalize_card_number("12345"), None);
        assert_eq!(normalize_card_number(""), None);
        assert_eq!(normalize_card_number("abc-def"), None);
    }

    #[test]
    fn gate_consumes_a_code_at_most_once() {
        let mut gate = ScanGate::new();

        assert!(gate.try_consume());
        assert!(!gate.try_consume(), "in-flight save must block scans");
        assert!(!gate.try_consume());

        gate.complete(true);
        assert!(
            !gate.try_consume(),
            "an accepted code keeps the gate closed until rearmed"
        );

        gate.rearm();
        assert!(gate.try_consume());
    }

    #[test]
    fn gate_rearms_after_a_failed_save() {
        let mut gate = ScanGate::new();

        assert!(gate.try_consume());
        gate.complete(false);
        assert!(gate.is_armed());
        assert!(gate.try_consume());
    }

    #[test]
    fn gate_ignores_rearm_while_in_flight() {
        let mut gate = ScanGate::new();

        assert!(gate.try_consume());
        gate.rearm();
        assert!(!gate.try_consume());
    }

    fn valid_form() -> VirtualCardRequest {
        VirtualCardRequest {
            first_name: "Мария".to_string(),
            middle_name: "Иванова".to_string(),
            last_name: "Петрова".to_string(),
            egn: "8501011234".to_string(),
            post_code: "1000".to_string(),
            phone: "0888 123 456".to_string(),
            email: "maria@example.com".to_string(),
            consent: true,
            ..VirtualCardRequest::default()
        }
    }

    #[test]
    fn virtual_form_validation_accepts_a_complete_form() {
        assert!(validate_virtual_form(&valid_form()).is_ok());
    }

    #[test]
    fn virtual_form_validation_rejects_bad_fields() {
        let mut form = valid_form();
        form.egn = "123".to_string();
        assert!(validate_virtual_form(&form).is_err());

        let mut form = valid_form();
        form.post_code = "12345".to_string();
        assert!(validate_virtual_form(&form).is_err());

        let mut form = valid_form();
        form.email = "not-an-email".to_string();
        assert!(validate_virtual_form(&form).is_err());

        let mut form = valid_form();
        form.consent = false;
        assert!(validate_virtual_form(&form).is_err());
    }
}
