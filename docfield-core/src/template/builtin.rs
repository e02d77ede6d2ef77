//! Templates shipped with the engine.
//!
//! Registration order matters: the classifier accepts the first template
//! whose anchors appear in order, so documents that share keywords with the
//! identity card front (household registers, marriage certificates) are
//! registered before it.

use crate::error::DocfieldError;

use super::{
    AnchorSpec, CanonicalFormat, CharClass, CleanupStep, Edge, FieldSpec, OffsetRect, Pattern,
    PostRule, Template,
};

const ID_NUMBER_PATTERN: &str = r"(\d{17}[\dXx]|\d{15})";
const AMOUNT_PATTERN: &str = r"(\d[\d,]*(?:\.\d{1,2})?)";

/// Every built-in template in registration order.
pub fn builtin_templates() -> Result<Vec<Template>, DocfieldError> {
    Ok(vec![
        household_register()?,
        marriage_certificate()?,
        tax_receipt()?,
        pos_slip()?,
        bank_card()?,
        id_card_back()?,
        id_card_front()?,
    ])
}

/// A value on the anchor's own line, bounded on the left by the anchor and
/// on the right by `after` character widths.
fn same_line(after: f32) -> OffsetRect {
    OffsetRect::line(0.5, after)
}

/// The anchor line plus `lines - 1` lines below it.
fn block(after: f32, lines: f32) -> OffsetRect {
    OffsetRect::new(
        Edge::left(-0.5),
        Edge::top(-0.25),
        Edge::right(after),
        Edge::top(lines + 0.25),
    )
}

fn id_number_field(name: &str, keywords: &[&str]) -> Result<FieldSpec, DocfieldError> {
    Ok(FieldSpec::new(name)
        .anchor(AnchorSpec::new(keywords).region(same_line(14.0)))
        .clean(CleanupStep::after_keyword(&["号码", "编号", "证件号"]))
        .clean(CleanupStep::Remove {
            chars: " ".to_string(),
        })
        .clean(CleanupStep::capture(Pattern::new(ID_NUMBER_PATTERN)?)))
}

fn sex_field(name: &str, anchor: AnchorSpec) -> Result<FieldSpec, DocfieldError> {
    Ok(FieldSpec::new(name)
        .anchor(anchor)
        .clean(CleanupStep::strip_label(&["性别"]))
        .clean(CleanupStep::capture(Pattern::new("[男女]")?)))
}

fn date_field(name: &str, anchor: AnchorSpec, keywords: &[&str]) -> FieldSpec {
    FieldSpec::new(name)
        .anchor(anchor)
        .clean(CleanupStep::after_keyword(keywords))
}

pub fn id_card_front() -> Result<Template, DocfieldError> {
    let name_anchor = AnchorSpec::new(&["姓名"])
        .region(same_line(8.0))
        // Sex sits on the line below the name
        .constrains(
            "sex",
            OffsetRect::new(
                Edge::left(-0.5),
                Edge::bottom(0.25),
                Edge::right(4.0),
                Edge::bottom(2.0),
            ),
            0.5,
        );

    let id_keywords = ["公民身份号码", "公民身份", "身份号码"];

    Ok(Template::new(
        "id_card_front",
        "Resident identity card, portrait side",
        &[&["姓名"], &["性别"], &["民族"], &["出生"], &["住址"], &id_keywords],
    )
    .field(
        FieldSpec::new("name")
            .anchor(name_anchor)
            .clean(CleanupStep::strip_label(&["姓名"]))
            .clean(CleanupStep::reject(&["性别", "民族", "出生", "住址"])),
    )
    .field(sex_field(
        "sex",
        AnchorSpec::new(&["性别"]).region(OffsetRect::line(0.5, 3.0)),
    )?)
    .field(
        FieldSpec::new("ethnicity")
            .anchor(AnchorSpec::new(&["民族"]).region(OffsetRect::line(0.5, 4.0)))
            .clean(CleanupStep::after_keyword(&["民族"]))
            .clean(CleanupStep::Retain {
                class: CharClass::Han,
            }),
    )
    .field(date_field(
        "birth_date",
        AnchorSpec::new(&["出生"]).region(same_line(12.0)),
        &["出生"],
    ))
    .field(
        FieldSpec::new("address")
            .anchor(AnchorSpec::new(&["住址"]).region(block(16.0, 3.0)))
            .clean(CleanupStep::strip_label(&["住址"]))
            .clean(CleanupStep::reject(&id_keywords))
            .accumulate(""),
    )
    .field(id_number_field("id_number", &id_keywords)?)
    .rule(PostRule::default_value("ethnicity", "汉"))
    .rule(PostRule::canonicalize("id_number", CanonicalFormat::IdNumber))
    .rule(PostRule::sex_from_id("id_number", "sex"))
    .rule(PostRule::birth_from_id("id_number", "birth_date"))
    .rule(PostRule::canonicalize("birth_date", CanonicalFormat::Date)))
}

pub fn id_card_back() -> Result<Template, DocfieldError> {
    Ok(Template::new(
        "id_card_back",
        "Resident identity card, emblem side",
        &[&["中华人民共和国"], &["居民身份证"], &["签发机关"], &["有效期限"]],
    )
    .field(
        FieldSpec::new("authority")
            .anchor(AnchorSpec::new(&["签发机关"]).region(same_line(14.0)))
            .clean(CleanupStep::strip_label(&["签发机关"])),
    )
    .field(
        FieldSpec::new("valid_period")
            .anchor(AnchorSpec::new(&["有效期限"]).region(same_line(16.0)))
            .clean(CleanupStep::strip_label(&["有效期限"])),
    )
    // Filled from the dates printed anywhere on the card
    .field(FieldSpec::new("valid_from"))
    .field(FieldSpec::new("valid_to"))
    .rule(PostRule::canonicalize("valid_period", CanonicalFormat::DateRange))
    .rule(PostRule::date_pair("valid_from", "valid_to", &[])))
}

pub fn household_register() -> Result<Template, DocfieldError> {
    let relation_keywords = ["户主或与户主关系", "与户主关系"];

    Ok(Template::new(
        "household_register",
        "Household register, resident page",
        &[
            &["常住人口登记卡"],
            &relation_keywords,
            &["曾用名"],
            &["出生地"],
            &["籍贯"],
        ],
    )
    .field(
        FieldSpec::new("name")
            .anchor(
                AnchorSpec::new(&["姓名"])
                    .region(same_line(6.0))
                    // Relation is printed in the cell right of the name
                    .constrains(
                        "relation",
                        OffsetRect::new(
                            Edge::right(1.0),
                            Edge::top(-0.25),
                            Edge::right(12.0),
                            Edge::bottom(0.25),
                        ),
                        0.8,
                    ),
            )
            .clean(CleanupStep::strip_label(&["姓名"]))
            .clean(CleanupStep::reject(&["户主", "关系", "曾用名"])),
    )
    .field(
        FieldSpec::new("relation")
            .anchor(AnchorSpec::new(&relation_keywords).region(same_line(4.0)))
            .clean(CleanupStep::after_keyword(&relation_keywords))
            .clean(CleanupStep::reject(&["姓名"])),
    )
    .field(sex_field(
        "sex",
        AnchorSpec::new(&["性别"]).region(same_line(3.0)),
    )?)
    .field(
        FieldSpec::new("ethnicity")
            .anchor(AnchorSpec::new(&["民族"]).region(OffsetRect::line(0.5, 4.0)))
            .clean(CleanupStep::after_keyword(&["民族"]))
            .clean(CleanupStep::Retain {
                class: CharClass::Han,
            }),
    )
    .field(
        FieldSpec::new("birthplace")
            .anchor(AnchorSpec::new(&["出生地"]).region(same_line(12.0)))
            .clean(CleanupStep::strip_label(&["出生地"])),
    )
    .field(date_field(
        "birth_date",
        AnchorSpec::new(&["出生日期"]).region(same_line(10.0)),
        &["出生日期"],
    ))
    .field(id_number_field(
        "id_number",
        &["公民身份证件编号", "身份证件编号", "公民身份号码"],
    )?)
    .rule(PostRule::default_value("ethnicity", "汉"))
    .rule(PostRule::canonicalize("id_number", CanonicalFormat::IdNumber))
    .rule(PostRule::sex_from_id("id_number", "sex"))
    .rule(PostRule::birth_from_id("id_number", "birth_date"))
    .rule(PostRule::canonicalize("birth_date", CanonicalFormat::Date)))
}

pub fn marriage_certificate() -> Result<Template, DocfieldError> {
    // Both parties print the same labels; the first block is party A.
    let name_pattern = r"^(\p{Han}+?)(?:性别.*)?$";

    let mut template = Template::new(
        "marriage_certificate",
        "Marriage certificate, registration page",
        &[&["结婚证"], &["持证人"], &["登记日期"], &["结婚证字号"]],
    )
    .field(
        FieldSpec::new("holder")
            .anchor(AnchorSpec::new(&["持证人"]).region(same_line(6.0)))
            .clean(CleanupStep::strip_label(&["持证人"])),
    )
    .field(date_field(
        "register_date",
        AnchorSpec::new(&["登记日期"]).region(same_line(10.0)),
        &["登记日期"],
    ))
    .field(
        FieldSpec::new("certificate_number")
            .anchor(AnchorSpec::new(&["结婚证字号"]).region(same_line(14.0)))
            .clean(CleanupStep::after_keyword(&["结婚证字号"]))
            .clean(CleanupStep::capture(Pattern::new(r"([A-Za-z0-9\-]{6,})")?)),
    )
    .rule(PostRule::canonicalize("register_date", CanonicalFormat::Date));

    for (party, occurrence) in [("party_a", 0), ("party_b", 1)] {
        let field = |suffix: &str| format!("{party}_{suffix}");

        template = template
            .field(
                FieldSpec::new(&field("name"))
                    .anchor(
                        AnchorSpec::new(&["姓名"])
                            .occurrence(occurrence)
                            .region(same_line(6.0)),
                    )
                    .clean(CleanupStep::strip_label(&["姓名"]))
                    .clean(CleanupStep::capture(Pattern::new(name_pattern)?)),
            )
            .field(sex_field(
                &field("sex"),
                AnchorSpec::new(&["性别"])
                    .occurrence(occurrence)
                    .region(same_line(3.0)),
            )?)
            .field(date_field(
                &field("birth_date"),
                AnchorSpec::new(&["出生日期"])
                    .occurrence(occurrence)
                    .region(same_line(10.0)),
                &["出生日期"],
            ))
            .field(
                FieldSpec::new(&field("id_number"))
                    .anchor(
                        AnchorSpec::new(&["身份证件号"])
                            .occurrence(occurrence)
                            .region(same_line(14.0)),
                    )
                    .clean(CleanupStep::after_keyword(&["身份证件号"]))
                    .clean(CleanupStep::capture(Pattern::new(ID_NUMBER_PATTERN)?)),
            )
            .rule(PostRule::canonicalize(
                &field("id_number"),
                CanonicalFormat::IdNumber,
            ))
            .rule(PostRule::sex_from_id(&field("id_number"), &field("sex")))
            .rule(PostRule::birth_from_id(
                &field("id_number"),
                &field("birth_date"),
            ))
            .rule(PostRule::canonicalize(
                &field("birth_date"),
                CanonicalFormat::Date,
            ));
    }

    // A birth date whose label OCR missed still shows up as a date on the
    // page; the earlier one belongs to party A.
    Ok(template.rule(PostRule::date_pair(
        "party_a_birth_date",
        "party_b_birth_date",
        &["登记日期"],
    )))
}

pub fn tax_receipt() -> Result<Template, DocfieldError> {
    Ok(Template::new(
        "tax_receipt",
        "Tax payment certificate",
        &[&["税收完税证明", "完税证明"], &["纳税人识别号"], &["纳税人名称"]],
    )
    .field(
        FieldSpec::new("taxpayer_id")
            .anchor(AnchorSpec::new(&["纳税人识别号"]).region(same_line(14.0)))
            .clean(CleanupStep::after_keyword(&["纳税人识别号"]))
            .clean(CleanupStep::Retain {
                class: CharClass::Alnum,
            })
            .clean(CleanupStep::Length {
                min: 15,
                max: Some(20),
            }),
    )
    .field(
        FieldSpec::new("taxpayer_name")
            .anchor(AnchorSpec::new(&["纳税人名称"]).region(same_line(16.0)))
            .clean(CleanupStep::after_keyword(&["纳税人名称"])),
    )
    .field(date_field(
        "issue_date",
        AnchorSpec::new(&["填发日期"]).region(same_line(10.0)),
        &["填发日期"],
    ))
    .field(
        FieldSpec::new("total_amount")
            .anchor(AnchorSpec::new(&["金额合计", "合计"]).region(same_line(20.0)))
            .clean(CleanupStep::after_keyword(&["小写", "金额合计", "合计"]))
            .clean(CleanupStep::capture(Pattern::new(AMOUNT_PATTERN)?)),
    )
    .rule(PostRule::canonicalize("issue_date", CanonicalFormat::Date))
    .rule(PostRule::canonicalize("total_amount", CanonicalFormat::Amount)))
}

pub fn pos_slip() -> Result<Template, DocfieldError> {
    Ok(Template::new(
        "pos_slip",
        "Card payment terminal slip",
        &[&["签购单"], &["商户名称"], &["终端编号", "终端号"], &["卡号"], &["金额"]],
    )
    .field(
        FieldSpec::new("merchant_name")
            // The value may wrap onto the line below the label
            .anchor(AnchorSpec::new(&["商户名称"]).region(block(16.0, 2.0)))
            .clean(CleanupStep::after_keyword(&["商户名称"]))
            .clean(CleanupStep::reject(&["商户编号", "商户号"])),
    )
    .field(
        FieldSpec::new("merchant_id")
            .anchor(AnchorSpec::new(&["商户编号", "商户号"]).region(same_line(16.0)))
            .clean(CleanupStep::after_keyword(&["商户编号", "商户号"]))
            .clean(CleanupStep::Retain {
                class: CharClass::Alnum,
            })
            .clean(CleanupStep::Length {
                min: 8,
                max: Some(20),
            }),
    )
    .field(
        FieldSpec::new("terminal_id")
            .anchor(AnchorSpec::new(&["终端编号", "终端号"]).region(same_line(12.0)))
            .clean(CleanupStep::after_keyword(&["终端编号", "终端号"]))
            .clean(CleanupStep::Retain {
                class: CharClass::Alnum,
            }),
    )
    .field(
        FieldSpec::new("card_number")
            .anchor(AnchorSpec::new(&["卡号"]).region(block(16.0, 2.0)))
            .clean(CleanupStep::after_keyword(&["卡号"]))
            .clean(CleanupStep::Remove {
                chars: " ".to_string(),
            })
            .clean(CleanupStep::capture(Pattern::new(r"(\d[\d*]{10,}\d)")?)),
    )
    .field(
        FieldSpec::new("amount")
            .anchor(AnchorSpec::new(&["金额"]).region(block(12.0, 2.0)))
            .clean(CleanupStep::after_keyword(&["金额"]))
            .clean(CleanupStep::capture(Pattern::new(AMOUNT_PATTERN)?)),
    )
    .field(
        FieldSpec::new("transaction_time")
            .anchor(AnchorSpec::new(&["日期/时间", "日期时间"]).region(same_line(16.0)))
            .clean(CleanupStep::after_keyword(&["日期/时间", "日期时间"])),
    )
    .rule(PostRule::canonicalize("amount", CanonicalFormat::Amount)))
}

pub fn bank_card() -> Result<Template, DocfieldError> {
    // The card number carries no label; both logos bound it vertically.
    let below_bank_name = OffsetRect {
        top: Some(Edge::bottom(1.0)),
        bottom: Some(Edge::bottom(5.0)),
        ..OffsetRect::default()
    };
    let above_union_logo = OffsetRect {
        top: Some(Edge::top(-4.0)),
        bottom: Some(Edge::top(-0.5)),
        ..OffsetRect::default()
    };

    Ok(Template::new(
        "bank_card",
        "Bank card, front side",
        &[&["银行", "bank"], &["银联", "unionpay"]],
    )
    .field(
        FieldSpec::new("bank_name")
            .anchor(
                AnchorSpec::new(&["银行", "bank"])
                    .region(OffsetRect::line(0.5, 0.5))
                    .constrains("card_number", below_bank_name, 1.0),
            ),
    )
    .field(
        FieldSpec::new("card_number")
            .anchor(
                AnchorSpec::new(&["银联", "unionpay"])
                    .constrains("card_number", above_union_logo, 0.5),
            )
            .clean(CleanupStep::Require {
                class: CharClass::Digit,
                min_ratio: 0.8,
            })
            .clean(CleanupStep::Retain {
                class: CharClass::Digit,
            })
            .clean(CleanupStep::Length {
                min: 12,
                max: Some(19),
            }),
    )
    .field(
        FieldSpec::new("valid_thru")
            .anchor(AnchorSpec::new(&["valid thru", "有效期"]).region(same_line(6.0)))
            .clean(CleanupStep::capture(Pattern::new(r"(\d{2}/\d{2})")?)),
    )
    .rule(PostRule::canonicalize("card_number", CanonicalFormat::Digits)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_builtin_templates_validate() {
        let templates = builtin_templates().unwrap();
        assert_eq!(templates.len(), 7);

        let ids: HashSet<_> = templates.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), templates.len());

        for template in &templates {
            template.validate().unwrap();
        }
    }

    #[test]
    fn test_identity_front_registered_last() {
        let templates = builtin_templates().unwrap();
        assert_eq!(templates.last().unwrap().id, "id_card_front");
    }

    #[test]
    fn test_marriage_parties_use_occurrence() {
        let template = marriage_certificate().unwrap();
        let party_b = template.field_spec("party_b_name").unwrap();
        assert_eq!(party_b.anchors[0].occurrence, 1);
        assert!(template.field_spec("party_a_id_number").is_some());
    }

    #[test]
    fn test_marriage_birth_dates_paired() {
        let template = marriage_certificate().unwrap();
        let pair = template
            .post
            .iter()
            .find(|rule| matches!(rule, PostRule::DatePair { .. }))
            .unwrap();
        assert_eq!(
            pair,
            &PostRule::date_pair("party_a_birth_date", "party_b_birth_date", &["登记日期"])
        );
    }
}
