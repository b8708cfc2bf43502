//! Named errors of the marketplace program
//!
//! Anchor assigns custom error codes sequentially from 6000 in declaration
//! order. The client only needs to decode them, so the table below mirrors
//! the program's declaration order and messages.

use thiserror::Error;

/// First custom error code assigned by Anchor
pub const ANCHOR_ERROR_OFFSET: u32 = 6000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MarketplaceError {
    #[error("Unauthorized access or action")]
    Unauthorized,
    #[error("Invalid Perena USD* mint address provided")]
    InvalidPerenaMint,
    #[error("Marketplace operations are currently paused")]
    MarketplacePaused,
    #[error("Asset ownership verification is required before this action")]
    OwnershipVerificationRequired,
    #[error("Asset is not in the correct state to be listed for auction")]
    AssetNotReadyForAuction,
    #[error("Asset is already in an active auction")]
    AssetAlreadyInAuction,
    #[error("Auction has already ended")]
    AuctionEnded,
    #[error("Auction has not ended yet")]
    AuctionNotEnded,
    #[error("Bid amount is too low or not greater than the current highest bid")]
    BidTooLow,
    #[error("Auction is not in the expected status for this operation")]
    InvalidAuctionStatus,
    #[error("Asset is not in the expected status for this operation")]
    InvalidAssetStatus,
    #[error("Cross-chain attestation data is invalid or malformed")]
    InvalidAttestationData,
    #[error("Provided string exceeds maximum allowed length")]
    StringTooLong,
    #[error("Token account owner does not match the expected owner")]
    InvalidTokenAccountOwner,
    #[error("Provided treasury account does not match the configured treasury account")]
    InvalidTreasuryAccount,
    #[error("The specified account is not valid for receiving rent")]
    InvalidRentRecipient,
    #[error("Timestamp calculation resulted in an overflow or invalid time")]
    TimestampOverflow,
    #[error("Arithmetic calculation resulted in an overflow or underflow")]
    CalculationOverflow,
    #[error("Required token account for the previous highest bidder was not provided")]
    MissingPreviousBidderAccount,
    #[error("Signer is not the recorded winner of the auction")]
    NotAuctionWinner,
    #[error("Provided asset account is not the one associated with this auction")]
    InvalidAssetAccount,
    #[error("Auction is not in an active state for bidding or finalization attempts")]
    AuctionNotInActiveState,
    #[error("Auction is not in the correct state for settlement")]
    AuctionNotInSettlementState,
    #[error("Current asset status prevents this update or operation")]
    AssetStatusPreventsUpdate,
    #[error("Auction is not active")]
    AuctionNotActive,
    #[error("Invalid seller account for rent")]
    InvalidSellerAccountForRent,
}

impl MarketplaceError {
    /// Declaration order; index + offset is the on-chain code
    pub const ALL: [MarketplaceError; 26] = [
        MarketplaceError::Unauthorized,
        MarketplaceError::InvalidPerenaMint,
        MarketplaceError::MarketplacePaused,
        MarketplaceError::OwnershipVerificationRequired,
        MarketplaceError::AssetNotReadyForAuction,
        MarketplaceError::AssetAlreadyInAuction,
        MarketplaceError::AuctionEnded,
        MarketplaceError::AuctionNotEnded,
        MarketplaceError::BidTooLow,
        MarketplaceError::InvalidAuctionStatus,
        MarketplaceError::InvalidAssetStatus,
        MarketplaceError::InvalidAttestationData,
        MarketplaceError::StringTooLong,
        MarketplaceError::InvalidTokenAccountOwner,
        MarketplaceError::InvalidTreasuryAccount,
        MarketplaceError::InvalidRentRecipient,
        MarketplaceError::TimestampOverflow,
        MarketplaceError::CalculationOverflow,
        MarketplaceError::MissingPreviousBidderAccount,
        MarketplaceError::NotAuctionWinner,
        MarketplaceError::InvalidAssetAccount,
        MarketplaceError::AuctionNotInActiveState,
        MarketplaceError::AuctionNotInSettlementState,
        MarketplaceError::AssetStatusPreventsUpdate,
        MarketplaceError::AuctionNotActive,
        MarketplaceError::InvalidSellerAccountForRent,
    ];

    pub fn code(&self) -> u32 {
        // ALL is exhaustive, so the position always exists
        let idx = Self::ALL.iter().position(|e| e == self).unwrap_or_default();
        ANCHOR_ERROR_OFFSET + idx as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        let idx = code.checked_sub(ANCHOR_ERROR_OFFSET)? as usize;
        Self::ALL.get(idx).copied()
    }

    /// Whether retrying the same call later could succeed without changing inputs
    pub fn is_time_dependent(&self) -> bool {
        matches!(
            self,
            MarketplaceError::MarketplacePaused
                | MarketplaceError::AuctionNotEnded
                | MarketplaceError::OwnershipVerificationRequired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_declaration_order() {
        assert_eq!(MarketplaceError::Unauthorized.code(), 6000);
        assert_eq!(MarketplaceError::BidTooLow.code(), 6008);
        assert_eq!(MarketplaceError::InvalidSellerAccountForRent.code(), 6025);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(MarketplaceError::from_code(6012), Some(MarketplaceError::StringTooLong));
        assert_eq!(MarketplaceError::from_code(5999), None);
        assert_eq!(MarketplaceError::from_code(6026), None);
        for err in MarketplaceError::ALL {
            assert_eq!(MarketplaceError::from_code(err.code()), Some(err));
        }
    }

    #[test]
    fn test_time_dependent() {
        assert!(MarketplaceError::AuctionNotEnded.is_time_dependent());
        assert!(!MarketplaceError::BidTooLow.is_time_dependent());
    }
}
