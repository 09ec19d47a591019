use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::slot_state::SlotKey;
use crate::errors::DomainError;

/// Broad product family. Decides which slot a detected amount fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductFamily {
    Installment,
    Deposit,
    Annuity,
    Loan,
}

impl ProductFamily {
    /// Family implied by a free-form product-type label.
    ///
    /// Checks run in a fixed order (installment, deposit, loan), each as a
    /// substring match. Labels outside these three families return `None`.
    pub fn for_amount_routing(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase();
        if normalized.contains("적금") || normalized == "saving" {
            return Some(Self::Installment);
        }
        if normalized.contains("예금") || normalized == "deposit" {
            return Some(Self::Deposit);
        }
        if normalized.contains("대출") || normalized == "주담대" || normalized == "loan" {
            return Some(Self::Loan);
        }
        None
    }

    pub fn is_loan(&self) -> bool {
        matches!(self, ProductFamily::Loan)
    }
}

/// The product types offered in the advisory flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "적금")]
    InstallmentSavings,
    #[serde(rename = "예금")]
    TermDeposit,
    #[serde(rename = "연금저축")]
    PensionSavings,
    #[serde(rename = "주담대")]
    MortgageLoan,
    #[serde(rename = "전세자금대출")]
    JeonseLoan,
    #[serde(rename = "신용대출")]
    CreditLoan,
}

impl ProductType {
    pub const ALL: [ProductType; 6] = [
        ProductType::InstallmentSavings,
        ProductType::TermDeposit,
        ProductType::PensionSavings,
        ProductType::MortgageLoan,
        ProductType::JeonseLoan,
        ProductType::CreditLoan,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProductType::InstallmentSavings => "적금",
            ProductType::TermDeposit => "예금",
            ProductType::PensionSavings => "연금저축",
            ProductType::MortgageLoan => "주담대",
            ProductType::JeonseLoan => "전세자금대출",
            ProductType::CreditLoan => "신용대출",
        }
    }

    pub fn family(&self) -> ProductFamily {
        match self {
            ProductType::InstallmentSavings => ProductFamily::Installment,
            ProductType::TermDeposit => ProductFamily::Deposit,
            ProductType::PensionSavings => ProductFamily::Annuity,
            ProductType::MortgageLoan | ProductType::JeonseLoan | ProductType::CreditLoan => {
                ProductFamily::Loan
            }
        }
    }

    /// Slots the advisor must collect before it gives a final recommendation.
    pub fn required_slots(&self) -> &'static [SlotKey] {
        match self {
            ProductType::InstallmentSavings => &[SlotKey::MonthlyAmount, SlotKey::TermMonths],
            ProductType::TermDeposit => &[SlotKey::LumpSum, SlotKey::TermMonths],
            ProductType::PensionSavings => &[SlotKey::MonthlyAmount],
            ProductType::MortgageLoan | ProductType::JeonseLoan | ProductType::CreditLoan => {
                &[SlotKey::DesiredAmount, SlotKey::IncomeMonthly]
            }
        }
    }

    /// Best guess at the product type from a user's opening message. Saving-type
    /// wording falls back to installment savings, which is also the answer when
    /// nothing matches.
    pub fn infer(message: &str) -> Self {
        let text = message.trim();
        if text.contains("전세") {
            return ProductType::JeonseLoan;
        }
        if text.contains("주담대") || text.contains("주택담보") || text.contains("집 담보") {
            return ProductType::MortgageLoan;
        }
        if text.contains("신용대출") || text.contains("대출") || text.contains("빌리") {
            return ProductType::CreditLoan;
        }
        if text.contains("연금") || text.contains("노후") {
            return ProductType::PensionSavings;
        }
        if text.contains("예금") || text.contains("목돈을 맡") || text.contains("예치") {
            return ProductType::TermDeposit;
        }
        ProductType::InstallmentSavings
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProductType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed {
            "적금" | "saving" => Ok(Self::InstallmentSavings),
            "예금" | "deposit" => Ok(Self::TermDeposit),
            "연금저축" | "annuity" => Ok(Self::PensionSavings),
            "주담대" | "주택담보대출" => Ok(Self::MortgageLoan),
            "전세자금대출" => Ok(Self::JeonseLoan),
            "신용대출" => Ok(Self::CreditLoan),
            other => Err(DomainError::UnsupportedProductType(other.to_string())),
        }
    }
}
