//! The `MaXML_Envelope` pick-round schema.

use super::WireSchema;
use crate::error::TableError;
use crate::field::{Column, FanOutField, FieldSpec, FieldTable, ScalarField, Transform, Validator, ZipField};
use crate::wire::{Template, WireFormat};
use serde_json::{json, Value};

pub const NAME: &str = "cag";

const CANONICAL_REQUEST: &str = include_str!("../../templates/canonical-request.json");
const RESPONSE_TEMPLATE: &str = include_str!("../../templates/cag-response.xml");

const SHOW: &str = "MaXML_Envelope.PickRoundShow[0].DataArea[0].PickRoundShow[0].PickRound[0]";
const SYNC: &str = "MaXML_Envelope.PickRoundSync[0].DataArea[0].PickRoundSync[0].PickRound[0]";

const DISTANCE_UNIT: &str = "m";
const DEFAULT_VERTICAL_COORDINATE: &str = "001";

pub fn schema() -> Result<WireSchema, TableError> {
    Ok(WireSchema {
        name: NAME.to_string(),
        request: request_table()?,
        request_template: Template::parse(WireFormat::Json, CANONICAL_REQUEST)?,
        response: response_table()?,
        response_template: Template::parse(WireFormat::Xml, RESPONSE_TEMPLATE)?,
    })
}

fn show(field: &str) -> String {
    format!("{SHOW}.{field}")
}

fn sync(field: &str) -> String {
    format!("{SYNC}.{field}")
}

/// Wire request to canonical request.
pub fn request_table() -> Result<FieldTable, TableError> {
    let word = Validator::pattern(r"^\w+$")?;
    let flag = Validator::pattern(r"^(0|1)$")?;
    let digits = Validator::pattern(r"^\d+$")?;

    let fields: Vec<Box<dyn FieldSpec>> = vec![
        Box::new(
            ScalarField::new("apiKey", &show("ApiKey[0]"), "requestData.apiKey")?.validator(word),
        ),
        Box::new(
            ScalarField::new(
                "isClockwise",
                &show("IsPickDirectionClockwise[0]"),
                "requestData.isClockwise",
            )?
            .validator(flag.clone())
            .transform(Transform::Flag),
        ),
        Box::new(
            ScalarField::new("isReroute", &show("IsReroute[0]"), "requestData.isReroute")?
                .validator(flag)
                .transform(Transform::Flag),
        ),
        Box::new(
            ScalarField::new(
                "mobileUnitIdentifier",
                &show("MobileUnitId[0]"),
                "requestData.mobileUnitIdentifier",
            )?
            .validator(digits.clone()),
        ),
        Box::new(
            ScalarField::new(
                "pickRoundIdentifier",
                &show("PickRoundId[0]"),
                "requestData.pickRoundIdentifier",
            )?
            .validator(digits),
        ),
        Box::new(
            ZipField::new(
                "pickLocations",
                &show("PickLocationList[0].PickLocation"),
                "requestData.pickLocations",
                vec![
                    Column::new("assignmentIdentifier", "AssignmentId[0]")?,
                    Column::new("originalSortingNumber", "OrigSortOrderNo[0]")?,
                    Column::new("rackIdentifier", "Location[0].Rack[0]")?,
                    Column::new("materialHandlingSection", "Location[0].MHA[0]")?,
                    Column::new("rackLocationIdentifier_1", "Location[0].HorizontalCoordinate[0]")?,
                ],
            )?
            .constant("rackLocationIdentifier_2", Value::Null),
        ),
    ];

    FieldTable::new(fields)
}

fn pick_location_columns() -> Result<Vec<Column>, TableError> {
    Ok(vec![
        Column::new("assignmentIdentifier", "AssignmentId[0]")?,
        Column::new("originalSortingNumber", "OrigSortOrderNo[0]")?,
        Column::new("materialHandlingSection", "Location[0].MHA[0]")?,
        Column::new("rackIdentifier", "Location[0].Rack[0]")?,
        Column::new("rackLocationIdentifier_1", "Location[0].HorizontalCoordinate[0]")?,
        Column::new("rackLocationIdentifier_2", "Location[0].VerticalCoordinate[0]")?
            .with_default(json!(DEFAULT_VERTICAL_COORDINATE)),
        Column::new("optimizedSortingNumber", "NewSortingNumber[0]")?,
    ])
}

/// Canonical response to wire response.
pub fn response_table() -> Result<FieldTable, TableError> {
    let fields: Vec<Box<dyn FieldSpec>> = vec![
        Box::new(ScalarField::new(
            "pickRoundIdentifier",
            "requestData.pickRoundIdentifier",
            &sync("PickRoundId[0]"),
        )?),
        Box::new(ScalarField::new(
            "mobileUnitIdentifier",
            "requestData.mobileUnitIdentifier",
            &sync("MobileUnitId[0]"),
        )?),
        Box::new(
            ScalarField::new(
                "originalRouteDistance",
                "responseData.originalRouteDistance",
                &sync("DistRequest[0]"),
            )?
            .transform(Transform::AppendUnit(DISTANCE_UNIT)),
        ),
        Box::new(
            ScalarField::new(
                "optimalRouteDistance",
                "responseData.optimalRouteDistance",
                &sync("DistResponse[0]"),
            )?
            .transform(Transform::AppendUnit(DISTANCE_UNIT)),
        ),
        Box::new(FanOutField::new(
            "pickLocations",
            "responseData.pickLocations",
            &sync("PickLocationList[0]"),
            "PickLocation",
            pick_location_columns()?,
        )?),
    ];

    FieldTable::new(fields)
}

/// Wire response back to canonical response, the inverse of [`response_table`].
pub fn sync_response_table() -> Result<FieldTable, TableError> {
    let digits = Validator::pattern(r"^\d+$")?;
    let distance = Validator::pattern(r"^-?\d+m$")?;

    let fields: Vec<Box<dyn FieldSpec>> = vec![
        Box::new(
            ScalarField::new(
                "pickRoundIdentifier",
                &sync("PickRoundId[0]"),
                "requestData.pickRoundIdentifier",
            )?
            .validator(digits.clone()),
        ),
        Box::new(
            ScalarField::new(
                "mobileUnitIdentifier",
                &sync("MobileUnitId[0]"),
                "requestData.mobileUnitIdentifier",
            )?
            .validator(digits),
        ),
        Box::new(
            ScalarField::new(
                "originalRouteDistance",
                &sync("DistRequest[0]"),
                "responseData.originalRouteDistance",
            )?
            .validator(distance.clone())
            .transform(Transform::StripUnit(DISTANCE_UNIT)),
        ),
        Box::new(
            ScalarField::new(
                "optimalRouteDistance",
                &sync("DistResponse[0]"),
                "responseData.optimalRouteDistance",
            )?
            .validator(distance)
            .transform(Transform::StripUnit(DISTANCE_UNIT)),
        ),
        Box::new(ZipField::new(
            "pickLocations",
            &sync("PickLocationList[0].PickLocation"),
            "responseData.pickLocations",
            pick_location_columns()?,
        )?),
    ];

    FieldTable::new(fields)
}

/// Empty canonical response the inverse table writes into.
pub fn canonical_response_template() -> Template {
    Template::from_document(
        WireFormat::Json,
        json!({"requestData": {}, "responseData": {}}),
    )
}
