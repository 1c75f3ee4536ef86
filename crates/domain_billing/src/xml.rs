//! Generic invoice XML rendering

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use crate::document::{ChargeField, ChargePurpose, GenericInvoiceDocument, InvoiceLineItem};
use crate::error::DocumentError;

struct XmlWriter {
    inner: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    fn new() -> Result<Self, DocumentError> {
        let mut w = Self {
            inner: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        };
        w.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(w)
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), DocumentError> {
        self.inner
            .write_event(event)
            .map_err(|e| DocumentError::Render(e.to_string()))
    }

    fn start(&mut self, name: &str) -> Result<(), DocumentError> {
        self.write(Event::Start(BytesStart::new(name)))
    }

    fn end(&mut self, name: &str) -> Result<(), DocumentError> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), DocumentError> {
        self.start(name)?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn optional_element(&mut self, name: &str, text: Option<&str>) -> Result<(), DocumentError> {
        match text {
            Some(text) => self.text_element(name, text),
            None => Ok(()),
        }
    }

    fn finish(self) -> Vec<u8> {
        self.inner.into_inner().into_inner()
    }
}

/// Renders a document as a `GenericInvoiceMessage`
pub fn render(document: &GenericInvoiceDocument) -> Result<Vec<u8>, DocumentError> {
    let mut w = XmlWriter::new()?;
    let header = &document.transaction;

    w.start("GenericInvoiceMessage")?;

    w.start("TransactionInfo")?;
    w.text_element("Created", &header.created_at.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())?;
    w.text_element("FileName", &header.file_name)?;
    w.text_element("MessageSender", &header.sender)?;
    w.text_element("MessageReceiver", &header.receiver)?;
    w.text_element("MessageID", &header.message_id)?;
    w.text_element("ControlNumber", &header.control_number.to_string())?;
    w.end("TransactionInfo")?;

    w.start("GenericInvoice")?;
    w.text_element("Purpose", "Create")?;

    w.start("InvoiceHeader")?;
    w.text_element("InvoiceNumber", &document.invoice_number)?;
    w.text_element("InvoiceDateTime", &document.invoice_date.format("%Y-%m-%dT00:00:00").to_string())?;
    w.text_element("Currency", document.currency.code())?;
    w.end("InvoiceHeader")?;

    w.start("InvoiceDetails")?;
    for item in &document.line_items {
        write_line_item(&mut w, item)?;
    }
    w.end("InvoiceDetails")?;

    w.start("InvoiceSummary")?;
    w.text_element("NumberOfInvoiceLineItems", &document.line_item_count().to_string())?;
    w.end("InvoiceSummary")?;

    w.end("GenericInvoice")?;
    w.end("GenericInvoiceMessage")?;

    Ok(w.finish())
}

fn write_line_item(w: &mut XmlWriter, item: &InvoiceLineItem) -> Result<(), DocumentError> {
    w.start("InvoiceLineItem")?;
    w.optional_element("BillOfLadingNumber", item.bill_of_lading_number.as_deref())?;
    w.optional_element("ContainerNumber", item.container_number.as_deref())?;
    w.optional_element("OrderNumber", item.order_number.as_deref())?;
    w.optional_element("PartNumber", item.part_number.as_deref())?;
    if let Some(number) = item.line_item_number {
        w.text_element("LineItemNumber", &number.to_string())?;
    }
    for field in &item.charge_fields {
        write_charge_field(w, field)?;
    }
    w.end("InvoiceLineItem")
}

fn write_charge_field(w: &mut XmlWriter, field: &ChargeField) -> Result<(), DocumentError> {
    let places = field.value.currency().decimal_places() as usize;

    w.start("ChargeField")?;
    w.start("Type")?;
    w.text_element("Code", &field.code)?;
    w.end("Type")?;
    w.text_element("ChargeDate", &field.charge_date.format("%Y-%m-%d").to_string())?;
    w.text_element("Value", &format!("{:.*}", places, field.value.amount()))?;
    w.text_element("Currency", field.value.currency().code())?;
    if let Some(ChargePurpose::Decrement) = field.purpose {
        w.text_element("Purpose", "Decrement")?;
    }
    w.end("ChargeField")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentCategory, GenericInvoiceDocument};
    use chrono::{NaiveDate, TimeZone, Utc};
    use core_kernel::{BrokerInvoiceId, Currency, Money};
    use domain_customs::{BrokerInvoice, ChargeLine};
    use rust_decimal_macros::dec;

    fn document() -> GenericInvoiceDocument {
        let invoice = BrokerInvoice {
            id: BrokerInvoiceId::new(),
            entry_number: "31612345678".into(),
            invoice_number: "B1".into(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            billing_sequence: None,
            currency: Currency::USD,
            charge_lines: vec![ChargeLine::new("0044", dec!(25))],
        };
        let item = InvoiceLineItem {
            bill_of_lading_number: Some("MAEU1".into()),
            container_number: Some("C&1".into()),
            charge_fields: vec![ChargeField {
                code: "C080".into(),
                charge_date: invoice.invoice_date,
                value: Money::new(dec!(25), Currency::USD),
                purpose: Some(ChargePurpose::Decrement),
            }],
            ..Default::default()
        };
        GenericInvoiceDocument::new(
            DocumentCategory::Container,
            &invoice,
            "BROKER",
            "CUSTOMER",
            vec![item],
            Utc.with_ymd_and_hms(2024, 5, 7, 8, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_render_layout() {
        let xml = String::from_utf8(render(&document()).unwrap()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<FileName>GI_BROKER_CUSTOMER_31612345678_CONTAINER_20240507080000000.xml</FileName>"));
        assert!(xml.contains("<Purpose>Create</Purpose>"));
        assert!(xml.contains("<InvoiceNumber>31612345678</InvoiceNumber>"));
        assert!(xml.contains("<BillOfLadingNumber>MAEU1</BillOfLadingNumber>"));
        assert!(xml.contains("<Code>C080</Code>"));
        assert!(xml.contains("<Value>25.00</Value>"));
        assert!(xml.contains("<Purpose>Decrement</Purpose>"));
        assert!(xml.contains("<NumberOfInvoiceLineItems>1</NumberOfInvoiceLineItems>"));
        assert!(!xml.contains("<PartNumber>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = String::from_utf8(render(&document()).unwrap()).unwrap();
        assert!(xml.contains("<ContainerNumber>C&amp;1</ContainerNumber>"));
    }
}
