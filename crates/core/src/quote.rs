//! Quote checkout: message formatting and WhatsApp handoff.
//!
//! Checkout does not create an order anywhere. The cart and the visitor's
//! contact details are rendered into one human-readable message which is
//! handed to WhatsApp through a `wa.me` deep link; the store answers with
//! prices from there.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;

/// Header line of every quote message.
pub const QUOTE_TITLE: &str = "*Orçamento - Rocha Brindes*";

/// Base of the WhatsApp deep link.
const WHATSAPP_BASE: &str = "https://wa.me";

/// Errors that prevent a quote from being sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// Checkout was attempted with nothing in the cart.
    #[error("o orçamento está vazio")]
    EmptyCart,
    /// A required contact field was blank.
    #[error("campo obrigatório não preenchido: {0}")]
    MissingField(&'static str),
}

/// Contact details collected on the cart sidebar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteContact {
    pub name: String,
    /// CPF or CNPJ.
    pub document: String,
    pub address: String,
    /// Brazilian postal code.
    pub cep: String,
    #[serde(default)]
    pub observations: String,
}

impl QuoteContact {
    /// Check that every required field has content.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteError::MissingField`] naming the first blank field.
    pub fn validate(&self) -> Result<(), QuoteError> {
        let required = [
            ("nome", &self.name),
            ("CPF/CNPJ", &self.document),
            ("endereço", &self.address),
            ("CEP", &self.cep),
        ];
        for (label, value) in required {
            if value.trim().is_empty() {
                return Err(QuoteError::MissingField(label));
            }
        }
        Ok(())
    }
}

/// Render the quote message for `cart` and `contact`.
///
/// Contact fields come first, then one line per cart item, then the
/// observations line whenever the field is not empty.
#[must_use]
pub fn format_message(cart: &Cart, contact: &QuoteContact) -> String {
    let mut message = String::new();
    // Writing to a String cannot fail.
    let _ = write!(
        message,
        "{QUOTE_TITLE}\n\n\
         *Cliente:* {}\n\
         *CPF/CNPJ:* {}\n\
         *Endereço:* {}\n\
         *CEP:* {}\n\n\
         *Produtos:*\n",
        contact.name, contact.document, contact.address, contact.cep
    );

    for item in cart.items() {
        let _ = writeln!(
            message,
            "• {} (Cód: {}) - Qtd: {}",
            item.product.name, item.product.id, item.quantity
        );
    }

    if !contact.observations.is_empty() {
        let _ = write!(message, "\n*Observações:* {}", contact.observations);
    }

    message
}

/// Build the `wa.me` deep link carrying `message` for `phone`.
///
/// `phone` is the full international number, digits only.
#[must_use]
pub fn whatsapp_link(phone: &str, message: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!("{WHATSAPP_BASE}/{digits}?text={}", encode_component(message))
}

/// Percent-encode `text` as a URI component. The marks `!'()*` stay
/// literal, so links match what browsers build for the same message.
fn encode_component(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if matches!(c, '!' | '\'' | '(' | ')' | '*') {
            encoded.push(c);
        } else {
            encoded.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    encoded
}

/// Validate, format and link in one step.
///
/// # Errors
///
/// Returns [`QuoteError::EmptyCart`] for an empty cart, or the first
/// contact validation failure.
pub fn checkout_link(cart: &Cart, contact: &QuoteContact, phone: &str) -> Result<String, QuoteError> {
    if cart.is_empty() {
        return Err(QuoteError::EmptyCart);
    }
    contact.validate()?;
    Ok(whatsapp_link(phone, &format_message(cart, contact)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Product;

    fn contact(observations: &str) -> QuoteContact {
        QuoteContact {
            name: "Maria Souza".to_string(),
            document: "123.456.789-00".to_string(),
            address: "Rua das Flores, 10".to_string(),
            cep: "64000-000".to_string(),
            observations: observations.to_string(),
        }
    }

    fn two_item_cart() -> Cart {
        let mut cart = Cart::new();
        cart.add(Product::new("CAN-001", "Caneta Metálica"));
        cart.add(Product::new("COP-7", "Copo Térmico"));
        cart.add(Product::new("COP-7", "Copo Térmico"));
        cart
    }

    #[test]
    fn test_message_contains_fields_in_order() {
        let message = format_message(&two_item_cart(), &contact("Entrega urgente"));

        let expected = "*Orçamento - Rocha Brindes*\n\n\
                        *Cliente:* Maria Souza\n\
                        *CPF/CNPJ:* 123.456.789-00\n\
                        *Endereço:* Rua das Flores, 10\n\
                        *CEP:* 64000-000\n\n\
                        *Produtos:*\n\
                        • Caneta Metálica (Cód: CAN-001) - Qtd: 1\n\
                        • Copo Térmico (Cód: COP-7) - Qtd: 2\n\
                        \n*Observações:* Entrega urgente";
        assert_eq!(message, expected);
    }

    #[test]
    fn test_message_omits_empty_observations() {
        let message = format_message(&two_item_cart(), &contact(""));
        assert!(!message.contains("Observações"));
        assert!(message.ends_with("• Copo Térmico (Cód: COP-7) - Qtd: 2\n"));

    }

    #[test]
    fn test_message_keeps_whitespace_observations() {
        let message = format_message(&two_item_cart(), &contact("   "));
        assert!(message.ends_with("\n*Observações:*    "));
    }

    #[test]
    fn test_contact_precedes_products() {
        let message = format_message(&two_item_cart(), &contact("x"));
        let client = message.find("*Cliente:*").unwrap();
        let cep = message.find("*CEP:*").unwrap();
        let first_item = message.find("CAN-001").unwrap();
        let second_item = message.find("COP-7").unwrap();
        let obs = message.find("*Observações:*").unwrap();
        assert!(client < cep && cep < first_item && first_item < second_item && second_item < obs);
    }

    #[test]
    fn test_whatsapp_link_encodes_message() {
        let link = whatsapp_link("+55 (89) 99433-3316", "*Olá* & até já\n");
        assert_eq!(
            link,
            "https://wa.me/5589994333316?text=*Ol%C3%A1*%20%26%20at%C3%A9%20j%C3%A1%0A"
        );
    }

    #[test]
    fn test_whatsapp_link_leaves_uri_marks_unescaped() {
        let link = whatsapp_link("5589994333316", "Caneca (azul)! Tam. 'M' ~ 300ml_a-b*2 #1/2+");
        assert_eq!(
            link,
            "https://wa.me/5589994333316?text=Caneca%20(azul)!%20Tam.%20'M'%20~%20300ml_a-b*2%20%231%2F2%2B"
        );
    }

    #[test]
    fn test_validate_reports_first_blank_field() {
        let mut c = contact("");
        assert!(c.validate().is_ok());
        c.document = "  ".to_string();
        assert_eq!(c.validate(), Err(QuoteError::MissingField("CPF/CNPJ")));
        c.name = String::new();
        assert_eq!(c.validate(), Err(QuoteError::MissingField("nome")));
    }

    #[test]
    fn test_checkout_link_rejects_empty_cart() {
        let result = checkout_link(&Cart::new(), &contact(""), "5589994333316");
        assert_eq!(result, Err(QuoteError::EmptyCart));
    }

    #[test]
    fn test_checkout_link_builds_link() {
        let link = checkout_link(&two_item_cart(), &contact(""), "5589994333316").unwrap();
        assert!(link.starts_with("https://wa.me/5589994333316?text="));
        assert!(link.contains("CAN-001"));
    }
}
