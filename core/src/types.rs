//! Request and response DTOs for the postamat API.
//!
//! # Design
//! All types serialize with lowerCamelCase property names and skip absent
//! fields. The mock-server crate declares its own copies of these shapes;
//! integration tests catch any drift between the two.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Put an order into a postamat cell.
///
/// The open strategy is flattened, so exactly one of `openByCellCodes` or
/// `openByLocker` appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InsertOrderRequest {
    pub postamat_id: i32,
    pub postamat_code: String,
    #[serde(flatten)]
    pub open: OpenStrategy,
}

impl InsertOrderRequest {
    pub fn by_cell_codes<I, S>(postamat_id: i32, postamat_code: impl Into<String>, cell_codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            postamat_id,
            postamat_code: postamat_code.into(),
            open: OpenStrategy::OpenByCellCodes(OpenByCellCodes {
                cell_codes: cell_codes.into_iter().map(Into::into).collect(),
            }),
        }
    }

    pub fn by_locker(postamat_id: i32, postamat_code: impl Into<String>, open_type: i32, locker_number: i32) -> Self {
        Self {
            postamat_id,
            postamat_code: postamat_code.into(),
            open: OpenStrategy::OpenByLocker(OpenByLocker {
                open_type,
                locker_number,
            }),
        }
    }
}

/// How the postamat should open the target cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OpenStrategy {
    OpenByCellCodes(OpenByCellCodes),
    OpenByLocker(OpenByLocker),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpenByCellCodes {
    #[serde(default)]
    pub cell_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpenByLocker {
    pub open_type: i32,
    pub locker_number: i32,
}

/// Take an unclaimed order back out of a postamat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveExpiredOrderRequest {
    pub postamat_id: i32,
    /// Serialized as `yyyy-MM-dd`.
    pub delivery_date: NaiveDate,
    pub parcel_size: ParcelSize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParcelSize {
    pub length: i32,
    pub width: i32,
    pub height: i32,
}

/// Mark the orders in the listed cells as not picked up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrdWereNotPickedRequest {
    pub postamat_id: i32,
    pub postamat_code: String,
    #[serde(default)]
    pub cell_codes: Vec<String>,
}

/// Free cells as reported by the server, in server order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FreeCellsResponse {
    /// Missing or `null` on the wire reads as an empty list.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cells: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_by_cell_codes_wire_shape() {
        let req = InsertOrderRequest::by_cell_codes(7, "P-7", ["a100", "a101"]);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "postamatId": 7,
                "postamatCode": "P-7",
                "openByCellCodes": { "cellCodes": ["a100", "a101"] }
            })
        );
        assert!(value.get("openByLocker").is_none());
    }

    #[test]
    fn insert_by_locker_wire_shape() {
        let req = InsertOrderRequest::by_locker(7, "P-7", 2, 15);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "postamatId": 7,
                "postamatCode": "P-7",
                "openByLocker": { "openType": 2, "lockerNumber": 15 }
            })
        );
        assert!(value.get("openByCellCodes").is_none());
    }

    #[test]
    fn insert_request_reads_back_either_strategy() {
        let req: InsertOrderRequest = serde_json::from_str(
            r#"{"postamatId":1,"postamatCode":"X","openByLocker":{"openType":0,"lockerNumber":3}}"#,
        )
        .unwrap();
        assert_eq!(req, InsertOrderRequest::by_locker(1, "X", 0, 3));
    }

    #[test]
    fn retrieve_request_formats_date() {
        let req = RetrieveExpiredOrderRequest {
            postamat_id: 3,
            delivery_date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            parcel_size: ParcelSize {
                length: 30,
                width: 20,
                height: 10,
            },
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["deliveryDate"], "2024-03-09");
        assert_eq!(value["parcelSize"], json!({"length": 30, "width": 20, "height": 10}));
    }

    #[test]
    fn not_picked_request_keeps_cell_order() {
        let req = OrdWereNotPickedRequest {
            postamat_id: 1,
            postamat_code: "X".to_string(),
            cell_codes: vec!["b2".to_string(), "a1".to_string(), "b2".to_string()],
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["cellCodes"], json!(["b2", "a1", "b2"]));
    }

    #[test]
    fn free_cells_missing_property_is_empty() {
        let resp: FreeCellsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.cells.is_empty());
    }

    #[test]
    fn free_cells_null_property_is_empty() {
        let resp: FreeCellsResponse = serde_json::from_str(r#"{"cells":null}"#).unwrap();
        assert!(resp.cells.is_empty());
    }

    #[test]
    fn free_cells_keeps_duplicates() {
        let resp: FreeCellsResponse = serde_json::from_str(r#"{"cells":["a1","a1","a0"]}"#).unwrap();
        assert_eq!(resp.cells, vec!["a1", "a1", "a0"]);
    }
}
