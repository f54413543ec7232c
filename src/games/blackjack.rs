//! Blackjack round machine
//!
//! Single 52-card deck, one hand, no split. Cards are dealt
//! player/dealer/player/dealer; the dealer's second card stays hidden until the
//! round ends. The dealer peeks, so a dealer natural ends the round at the deal.

use crate::config::BlackjackConfig;
use crate::errors::ValidationError;
use crate::games::types::{BlackjackView, GameData, Resolution, RoundSnapshot, RoundStatus};
use crate::games::{RoundContext, RoundEnd, RoundMachine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

const BUST_LIMIT: u8 = 21;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

/// Playing card; `rank` is 1 (ace) through 13 (king)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: u8,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: u8, suit: Suit) -> Self {
        Self { rank, suit }
    }

    pub fn is_ace(&self) -> bool {
        self.rank == 1
    }

    /// Hard value: ace 1, face cards 10
    pub fn points(&self) -> u8 {
        self.rank.min(10)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = match self.rank {
            1 => "A".to_string(),
            11 => "J".to_string(),
            12 => "Q".to_string(),
            13 => "K".to_string(),
            n => n.to_string(),
        };
        let suit = match self.suit {
            Suit::Clubs => '♣',
            Suit::Diamonds => '♦',
            Suit::Hearts => '♥',
            Suit::Spades => '♠',
        };
        write!(f, "{}{}", rank, suit)
    }
}

/// Ordered 52-card deck; shuffle before dealing
pub fn fresh_deck() -> Vec<Card> {
    [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades]
        .iter()
        .flat_map(|&suit| (1..=13).map(move |rank| Card::new(rank, suit)))
        .collect()
}

/// Best total for a hand and whether an ace is still counted as 11
pub fn hand_value(cards: &[Card]) -> (u8, bool) {
    let hard: u8 = cards.iter().map(Card::points).sum();
    let has_ace = cards.iter().any(Card::is_ace);
    if has_ace && hard + 10 <= BUST_LIMIT {
        (hard + 10, true)
    } else {
        (hard, false)
    }
}

pub fn is_natural(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_value(cards).0 == BUST_LIMIT
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlackjackAction {
    Hit,
    Stand,
    Double,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlackjackOutcome {
    PlayerBlackjack,
    PlayerBust,
    DealerBust,
    PlayerWin,
    DealerWin,
    Push,
}

impl BlackjackOutcome {
    /// Return on the wager, stake included
    pub fn multiplier(&self, rules: &BlackjackConfig) -> Decimal {
        match self {
            BlackjackOutcome::PlayerBlackjack => Decimal::ONE + rules.blackjack_payout,
            BlackjackOutcome::DealerBust | BlackjackOutcome::PlayerWin => Decimal::TWO,
            BlackjackOutcome::Push => Decimal::ONE,
            BlackjackOutcome::PlayerBust | BlackjackOutcome::DealerWin => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlackjackRound {
    pub player_hand: Vec<Card>,
    pub dealer_hand: Vec<Card>,
    /// Undealt cards; the next card is popped from the end
    pub deck: Vec<Card>,
    /// Base wager; doubled rounds risk twice this
    pub amount_wagered: Decimal,
    pub doubled: bool,
    pub can_double: bool,
}

impl BlackjackRound {
    pub fn deal(
        amount: Decimal,
        deck: Vec<Card>,
        rules: &BlackjackConfig,
    ) -> Result<Self, ValidationError> {
        let mut round = Self {
            player_hand: Vec::with_capacity(6),
            dealer_hand: Vec::with_capacity(6),
            deck,
            amount_wagered: amount,
            doubled: false,
            can_double: rules.allow_double,
        };
        for _ in 0..2 {
            let card = round.draw()?;
            round.player_hand.push(card);
            let card = round.draw()?;
            round.dealer_hand.push(card);
        }
        Ok(round)
    }

    /// Outcome decided by the deal alone (either side holding a natural)
    pub fn opening_outcome(&self, rules: &BlackjackConfig) -> Option<Resolution> {
        let player = is_natural(&self.player_hand);
        let dealer = is_natural(&self.dealer_hand);
        match (player, dealer) {
            (true, true) if rules.push_on_dealer_natural => {
                Some(self.settle(BlackjackOutcome::Push, rules))
            }
            (true, _) => Some(self.settle(BlackjackOutcome::PlayerBlackjack, rules)),
            (false, true) => Some(self.settle(BlackjackOutcome::DealerWin, rules)),
            (false, false) => None,
        }
    }

    /// Total at risk, including a double
    pub fn total_wagered(&self) -> Decimal {
        if self.doubled {
            self.amount_wagered * Decimal::TWO
        } else {
            self.amount_wagered
        }
    }

    pub fn player_total(&self) -> u8 {
        hand_value(&self.player_hand).0
    }

    pub fn dealer_total(&self) -> u8 {
        hand_value(&self.dealer_hand).0
    }

    /// Apply a player action. `Some` means the round is over.
    pub fn apply(
        &mut self,
        action: BlackjackAction,
        rules: &BlackjackConfig,
    ) -> Result<Option<Resolution>, ValidationError> {
        match action {
            BlackjackAction::Hit => self.hit(rules),
            BlackjackAction::Stand => Ok(Some(self.stand(rules))),
            BlackjackAction::Double => self.double(rules).map(Some),
        }
    }

    pub fn hit(&mut self, rules: &BlackjackConfig) -> Result<Option<Resolution>, ValidationError> {
        let card = self.draw()?;
        self.player_hand.push(card);
        self.can_double = false;

        if self.player_total() > BUST_LIMIT {
            return Ok(Some(self.settle(BlackjackOutcome::PlayerBust, rules)));
        }
        Ok(None)
    }

    pub fn stand(&mut self, rules: &BlackjackConfig) -> Resolution {
        self.can_double = false;
        self.play_dealer(rules);

        let player = self.player_total();
        let dealer = self.dealer_total();
        let outcome = if dealer > BUST_LIMIT {
            BlackjackOutcome::DealerBust
        } else if player > dealer {
            BlackjackOutcome::PlayerWin
        } else if player == dealer {
            BlackjackOutcome::Push
        } else {
            BlackjackOutcome::DealerWin
        };
        self.settle(outcome, rules)
    }

    /// Legal only on the first two cards. The extra wager must already be debited.
    pub fn double(&mut self, rules: &BlackjackConfig) -> Result<Resolution, ValidationError> {
        self.check_double(rules)?;
        self.doubled = true;

        let card = self.draw()?;
        self.player_hand.push(card);
        self.can_double = false;

        if self.player_total() > BUST_LIMIT {
            return Ok(self.settle(BlackjackOutcome::PlayerBust, rules));
        }
        Ok(self.stand(rules))
    }

    pub fn check_double(&self, rules: &BlackjackConfig) -> Result<(), ValidationError> {
        if !rules.allow_double {
            return Err(ValidationError::IllegalAction(
                "doubling is disabled".to_string(),
            ));
        }
        if !self.can_double || self.doubled || self.player_hand.len() != 2 {
            return Err(ValidationError::IllegalAction(
                "double is only allowed on the first two cards".to_string(),
            ));
        }
        Ok(())
    }

    pub fn view(&self, round_id: uuid::Uuid) -> BlackjackView {
        BlackjackView {
            round_id,
            amount_wagered: self.total_wagered(),
            player_hand: self.player_hand.clone(),
            player_total: self.player_total(),
            dealer_up_card: self.dealer_hand[0],
            can_double: self.can_double,
        }
    }

    fn play_dealer(&mut self, rules: &BlackjackConfig) {
        loop {
            let (total, soft) = hand_value(&self.dealer_hand);
            let hits = total < rules.dealer_stands_on
                || (total == rules.dealer_stands_on && soft && rules.dealer_hits_soft_17);
            if !hits {
                break;
            }
            // A single deck cannot run dry within one hand; stand if it somehow does
            match self.deck.pop() {
                Some(card) => self.dealer_hand.push(card),
                None => break,
            }
        }
    }

    fn draw(&mut self) -> Result<Card, ValidationError> {
        self.deck
            .pop()
            .ok_or_else(|| ValidationError::IllegalAction("deck exhausted".to_string()))
    }

    fn settle(&self, outcome: BlackjackOutcome, rules: &BlackjackConfig) -> Resolution {
        let data = GameData::Blackjack {
            player_hand: self.player_hand.clone(),
            dealer_hand: self.dealer_hand.clone(),
            doubled: self.doubled,
            outcome,
        };
        Resolution::with_multiplier(self.total_wagered(), outcome.multiplier(rules), data)
    }
}

impl RoundMachine for BlackjackRound {
    /// Idle rounds are stood on behalf of the player
    fn poll(&self, ctx: &RoundContext<'_>) -> Option<RoundEnd> {
        if (ctx.idle_secs() as u64) <= ctx.config.blackjack.round_ttl_secs {
            return None;
        }
        let mut round = self.clone();
        Some(RoundEnd {
            status: RoundStatus::Expired,
            resolution: round.stand(&ctx.config.blackjack),
        })
    }

    fn snapshot(&self, ctx: &RoundContext<'_>) -> RoundSnapshot {
        RoundSnapshot::Blackjack(self.view(ctx.round_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CasinoConfig;
    use crate::games::paytable::PayoutTables;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn c(rank: u8) -> Card {
        Card::new(rank, Suit::Spades)
    }

    /// Deck that deals `player` and `dealer` first, then `rest` in order
    fn stacked(player: [u8; 2], dealer: [u8; 2], rest: &[u8]) -> Vec<Card> {
        let mut order = vec![player[0], dealer[0], player[1], dealer[1]];
        order.extend_from_slice(rest);
        order.into_iter().rev().map(c).collect()
    }

    fn rules() -> BlackjackConfig {
        BlackjackConfig::default()
    }

    /// 100 on the table
    fn deal(deck: Vec<Card>) -> BlackjackRound {
        BlackjackRound::deal(Decimal::new(100, 0), deck, &rules()).unwrap()
    }

    #[test]
    fn test_hand_value_soft_and_hard() {
        assert_eq!(hand_value(&[c(1), c(6)]), (17, true));
        assert_eq!(hand_value(&[c(1), c(6), c(10)]), (17, false));
        assert_eq!(hand_value(&[c(1), c(1), c(9)]), (21, true));
        assert_eq!(hand_value(&[c(13), c(12), c(2)]), (22, false));
        assert!(is_natural(&[c(1), c(11)]));
        assert!(!is_natural(&[c(7), c(7), c(7)]));
    }

    #[test]
    fn test_fresh_deck() {
        let deck = fresh_deck();
        assert_eq!(deck.len(), 52);
        let unique: std::collections::HashSet<_> = deck.iter().collect();
        assert_eq!(unique.len(), 52);
    }

    #[test]
    fn test_player_natural_pays_three_to_two() {
        let round = deal(stacked([1, 13], [9, 7], &[]));
        let resolution = round.opening_outcome(&rules()).unwrap();

        assert_eq!(resolution.payout, Decimal::new(250, 0));
        assert!(matches!(
            resolution.data,
            GameData::Blackjack { outcome: BlackjackOutcome::PlayerBlackjack, .. }
        ));
    }

    #[test]
    fn test_natural_against_natural() {
        let deck = stacked([1, 13], [1, 12], &[]);
        let round = deal(deck);
        assert_eq!(round.opening_outcome(&rules()).unwrap().payout, Decimal::new(250, 0));

        let push_rules = BlackjackConfig {
            push_on_dealer_natural: true,
            ..rules()
        };
        assert_eq!(round.opening_outcome(&push_rules).unwrap().payout, Decimal::new(100, 0));
    }

    #[test]
    fn test_dealer_natural_ends_round() {
        let round = deal(stacked([10, 9], [1, 10], &[]));
        let resolution = round.opening_outcome(&rules()).unwrap();
        assert_eq!(resolution.payout, Decimal::ZERO);
    }

    #[test]
    fn test_hit_past_21_busts_immediately() {
        let mut round = deal(stacked([10, 6], [9, 7], &[8]));
        assert!(round.opening_outcome(&rules()).is_none());

        let resolution = round.hit(&rules()).unwrap().unwrap();
        assert_eq!(resolution.payout, Decimal::ZERO);
        assert_eq!(round.player_total(), 24);
    }

    #[test]
    fn test_stand_dealer_draws_to_17() {
        // dealer 9+5 draws a 2 (16), then a 10 and busts
        let mut round = deal(stacked([10, 8], [9, 5], &[2, 10]));
        let resolution = round.stand(&rules());

        assert_eq!(round.dealer_hand.len(), 4);
        assert_eq!(resolution.payout, Decimal::new(200, 0));
        assert!(matches!(
            resolution.data,
            GameData::Blackjack { outcome: BlackjackOutcome::DealerBust, .. }
        ));
    }

    #[test]
    fn test_equal_totals_push() {
        let mut round = deal(stacked([10, 8], [9, 9], &[]));
        let resolution = round.stand(&rules());
        assert_eq!(resolution.payout, Decimal::new(100, 0));
        assert_eq!(resolution.multiplier, Decimal::ONE);
    }

    #[test]
    fn test_soft_17_rule() {
        let deck = || stacked([10, 8], [1, 6], &[3]);

        let mut stands = deal(deck());
        stands.stand(&rules());
        assert_eq!(stands.dealer_hand.len(), 2);

        let h17 = BlackjackConfig {
            dealer_hits_soft_17: true,
            ..rules()
        };
        let mut hits = deal(deck());
        hits.stand(&h17);
        assert_eq!(hits.dealer_hand.len(), 3);
        assert_eq!(hits.dealer_total(), 20);
    }

    #[test]
    fn test_double_draws_one_card_and_stands() {
        let mut round = deal(stacked([6, 5], [10, 7], &[10, 4]));
        let resolution = round.double(&rules()).unwrap();

        assert_eq!(round.player_hand.len(), 3);
        assert_eq!(resolution.wagered, Decimal::new(200, 0));
        assert_eq!(resolution.payout, Decimal::new(400, 0));
    }

    #[test]
    fn test_double_after_hit_is_illegal() {
        let mut round = deal(stacked([2, 3], [10, 7], &[4, 5]));
        round.hit(&rules()).unwrap();
        assert!(matches!(
            round.double(&rules()),
            Err(ValidationError::IllegalAction(_))
        ));
    }

    #[test]
    fn test_idle_round_auto_stands() {
        let config = CasinoConfig::default();
        let tables = PayoutTables::from_config(&config);
        let round = deal(stacked([10, 9], [10, 7], &[]));

        let started_at = Utc::now();
        let mut ctx = RoundContext {
            round_id: Uuid::new_v4(),
            started_at,
            updated_at: started_at,
            now: started_at + Duration::seconds(60),
            config: &config,
            tables: &tables,
        };
        assert!(round.poll(&ctx).is_none());

        ctx.now = started_at + Duration::seconds(3601);
        let end = round.poll(&ctx).unwrap();
        assert_eq!(end.status, RoundStatus::Expired);
        assert_eq!(end.resolution.payout, Decimal::new(200, 0));
    }

    #[test]
    fn test_view_hides_hole_card() {
        let round = deal(stacked([10, 9], [4, 13], &[]));
        let view: BlackjackView = round.view(Uuid::new_v4());
        assert_eq!(view.dealer_up_card, c(4));

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("\"rank\":13"));
    }
}
