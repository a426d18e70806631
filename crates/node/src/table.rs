// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Table actor.
//!
//! Each table runs in its own task that owns the [GameEngine], requests are
//! sent to the task through a channel and applied one at a time.
use ahash::AHashMap;
use anyhow::{Result, bail};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use pokerchain_core::{
    amount::Amount,
    crypto::{Address, SigningKey},
    dto::TableStateDto,
    message::{Request, SignedRequest},
    poker::Chips,
};

use crate::{
    db::Db,
    errors::{ErrorKind, GameError},
    game::{GameEngine, Player},
    ledger::AccountLedger,
};

/// A handle to a table task.
#[derive(Debug, Clone)]
pub struct Table {
    /// The table address.
    address: Address,
    /// Channel for sending commands.
    commands_tx: mpsc::Sender<TableCommand>,
}

/// Command for the table task.
#[derive(Debug)]
enum TableCommand {
    /// Join this table.
    Join {
        player: Address,
        buy_in: Chips,
        seat: Option<u8>,
        prepaid: bool,
        resp_tx: oneshot::Sender<Result<u8>>,
    },
    /// Leave this table.
    Leave {
        player: Address,
        resp_tx: oneshot::Sender<Result<Chips>>,
    },
    /// Handle a signed player request.
    Request {
        req: SignedRequest,
        resp_tx: oneshot::Sender<Result<TableStateDto>>,
    },
    /// Deal a new hand.
    Deal {
        seed: Vec<u8>,
        resp_tx: oneshot::Sender<Result<()>>,
    },
    /// Get a signed snapshot.
    Snapshot {
        viewer: Option<Address>,
        resp_tx: oneshot::Sender<TableStateDto>,
    },
}

impl Table {
    /// Spawns a task for the given engine.
    ///
    /// A table without a deal secret gets one derived from the table key.
    pub fn new(
        mut engine: GameEngine,
        sk: Arc<SigningKey>,
        ledger: AccountLedger,
        db: Db,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(128);
        let address = engine.address().clone();

        if !engine.has_deal_secret() {
            engine.set_deal_secret(&sk.sign(&address).to_bytes());
        }

        let mut task = TableTask {
            last_good: engine.to_json(),
            engine,
            sk,
            ledger,
            db,
            nonces: AHashMap::default(),
            commands_rx,
        };

        tokio::spawn(async move {
            task.run().await;
            info!("Table task for table {} stopped", task.engine.address());
        });

        Self {
            address,
            commands_tx,
        }
    }

    /// The table address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// A player joins this table moving the buy-in from its account.
    ///
    /// Returns the player seat.
    pub async fn join(&self, player: &Address, buy_in: Chips, seat: Option<u8>) -> Result<u8> {
        self.send_join(player, buy_in, seat, false).await
    }

    /// Seats a player whose buy-in is already in the table account.
    ///
    /// The buy-in goes back to the player if it cannot be seated.
    pub async fn seat_paid(&self, player: &Address, buy_in: Chips, seat: Option<u8>) -> Result<u8> {
        self.send_join(player, buy_in, seat, true).await
    }

    async fn send_join(
        &self,
        player: &Address,
        buy_in: Chips,
        seat: Option<u8>,
        prepaid: bool,
    ) -> Result<u8> {
        let (resp_tx, resp_rx) = oneshot::channel();

        self.commands_tx
            .send(TableCommand::Join {
                player: player.clone(),
                buy_in,
                seat,
                prepaid,
                resp_tx,
            })
            .await?;

        resp_rx.await?
    }

    /// A player leaves the table, its chips go back to its account.
    ///
    /// Returns the chips credited to the player.
    pub async fn leave(&self, player: &Address) -> Result<Chips> {
        let (resp_tx, resp_rx) = oneshot::channel();

        self.commands_tx
            .send(TableCommand::Leave {
                player: player.clone(),
                resp_tx,
            })
            .await?;

        resp_rx.await?
    }

    /// Handles a signed request, returns the table as seen by the sender.
    pub async fn request(&self, req: SignedRequest) -> Result<TableStateDto> {
        let (resp_tx, resp_rx) = oneshot::channel();

        self.commands_tx
            .send(TableCommand::Request { req, resp_tx })
            .await?;

        resp_rx.await?
    }

    /// Deals a new hand.
    pub async fn deal(&self, seed: Vec<u8>) -> Result<()> {
        let (resp_tx, resp_rx) = oneshot::channel();

        self.commands_tx
            .send(TableCommand::Deal { seed, resp_tx })
            .await?;

        resp_rx.await?
    }

    /// Returns a signed snapshot of the table as seen by `viewer`.
    pub async fn snapshot(&self, viewer: Option<&Address>) -> Result<TableStateDto> {
        let (resp_tx, resp_rx) = oneshot::channel();

        self.commands_tx
            .send(TableCommand::Snapshot {
                viewer: viewer.cloned(),
                resp_tx,
            })
            .await?;

        Ok(resp_rx.await?)
    }
}

struct TableTask {
    /// The table state.
    engine: GameEngine,
    /// The last state that was saved.
    last_good: String,
    /// Table key.
    sk: Arc<SigningKey>,
    /// Accounts ledger for buy-ins and cash-outs.
    ledger: AccountLedger,
    /// Tables db.
    db: Db,
    /// The last request nonce of each player, never reset.
    nonces: AHashMap<Address, u64>,
    /// Channel for receiving table commands.
    commands_rx: mpsc::Receiver<TableCommand>,
}

impl TableTask {
    async fn run(&mut self) {
        let address = self.engine.address().clone();
        match self.db.load_nonces(address.clone()).await {
            Ok(nonces) => self.nonces.extend(nonces),
            Err(e) => {
                error!("Table {address} cannot load request nonces: {e}");
                return;
            }
        }

        while let Some(cmd) = self.commands_rx.recv().await {
            match cmd {
                TableCommand::Join {
                    player,
                    buy_in,
                    seat,
                    prepaid,
                    resp_tx,
                } => {
                    let res = self.join(&player, buy_in, seat, prepaid).await;
                    let _ = resp_tx.send(res);
                }
                TableCommand::Leave { player, resp_tx } => {
                    let res = self.leave(&player).await;
                    let _ = resp_tx.send(res);
                }
                TableCommand::Request { req, resp_tx } => {
                    let res = self.request(req).await;
                    let _ = resp_tx.send(res);
                }
                TableCommand::Deal { seed, resp_tx } => {
                    let res = self.mutate(|engine| engine.deal(&seed)).await;
                    let _ = resp_tx.send(res.map_err(Into::into));
                }
                TableCommand::Snapshot { viewer, resp_tx } => {
                    let _ = resp_tx.send(self.snapshot(viewer.as_ref()));
                }
            }
        }
    }

    async fn join(
        &mut self,
        player: &Address,
        buy_in: Chips,
        seat: Option<u8>,
        prepaid: bool,
    ) -> Result<u8> {
        let table = self.engine.address().clone();
        let amount = Amount::from(buy_in);

        if !prepaid {
            self.ledger.transfer(player, &table, amount.clone()).await?;
        }

        let new_player = Player::new(player.clone(), buy_in);
        let res = self
            .mutate(|engine| match seat {
                Some(seat) => engine.join_at_seat(new_player, seat),
                None => engine.join(new_player),
            })
            .await;

        if res.is_err() {
            if let Err(e) = self.ledger.transfer(&table, player, amount).await {
                error!("Table {table} refund of {buy_in} to {player} failed: {e}");
            }
        }

        Ok(res?)
    }

    async fn leave(&mut self, player: &Address) -> Result<Chips> {
        let table = self.engine.address().clone();

        // The player stays seated until the cash-out is credited.
        let mut engine = self.engine.clone();
        let left = engine.leave(player)?;

        if !left.chips.is_zero() {
            let res = self
                .ledger
                .transfer(&table, player, Amount::from(left.chips))
                .await;
            if let Err(e) = res {
                error!("Table {table} cash-out of {} to {player} failed: {e}", left.chips);
                return Err(e.into());
            }
        }

        self.engine = engine;
        self.save().await;

        Ok(left.chips)
    }

    async fn request(&mut self, req: SignedRequest) -> Result<TableStateDto> {
        if !req.verify() {
            bail!("invalid request signature");
        }

        let sender = req.sender();
        if req.request().table() != self.engine.address() {
            bail!(
                "request for table {} sent to {}",
                req.request().table(),
                self.engine.address()
            );
        }

        let expected = self.nonces.get(&sender).copied().unwrap_or_default() + 1;
        if req.nonce() != expected {
            bail!(
                "invalid request nonce for {sender}: expected {expected}, got {}",
                req.nonce()
            );
        }

        // A nonce is spent even when its request fails.
        self.db
            .save_nonce(self.engine.address().clone(), sender.clone(), req.nonce())
            .await?;
        self.nonces.insert(sender.clone(), req.nonce());

        match req.request() {
            Request::Join { buy_in, seat, .. } => {
                self.join(&sender, *buy_in, *seat, false).await?;
            }
            Request::Leave { .. } => {
                self.leave(&sender).await?;
            }
            Request::Action { action, amount, .. } => {
                self.mutate(|engine| engine.perform_action(&sender, *action, *amount))
                    .await?;
            }
            Request::Deal { seed, .. } => {
                if self.engine.player(&sender).is_none() {
                    return Err(GameError::PlayerNotFound(sender).into());
                }

                self.mutate(|engine| engine.deal(seed)).await?;
            }
        }

        Ok(self.snapshot(Some(&sender)))
    }

    fn snapshot(&self, viewer: Option<&Address>) -> TableStateDto {
        self.engine.to_dto(viewer).signed(&self.sk)
    }

    /// Applies a change to the engine, saves the new state on success and
    /// restores the last saved state if the change broke the engine.
    async fn mutate<T>(
        &mut self,
        f: impl FnOnce(&mut GameEngine) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let res = f(&mut self.engine);

        match &res {
            Ok(_) => self.save().await,
            Err(e) if e.kind() == ErrorKind::Fatal => self.restore(),
            Err(_) => {}
        }

        res
    }

    async fn save(&mut self) {
        self.last_good = self.engine.to_json();

        let res = self
            .db
            .save_table(self.engine.address().clone(), self.last_good.clone())
            .await;
        if let Err(e) = res {
            error!("Table {} save failed: {e}", self.engine.address());
        }
    }

    fn restore(&mut self) {
        warn!(
            "Table {} restoring the last saved state",
            self.engine.address()
        );

        match GameEngine::from_json(&self.last_good) {
            Ok(engine) => self.engine = engine,
            Err(e) => error!("Table {} restore failed: {e}", self.engine.address()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::TableConfig;
    use pokerchain_core::{message::PlayerAction, poker::Round};

    struct TestTable {
        table: Table,
        ledger: AccountLedger,
        db: Db,
        sk: Arc<SigningKey>,
    }

    impl TestTable {
        fn new() -> Self {
            let engine = GameEngine::new(Address::new("table-1"), TableConfig::default()).unwrap();
            Self::with_engine(engine)
        }

        fn with_engine(engine: GameEngine) -> Self {
            let db = Db::open_in_memory().unwrap();
            let ledger = AccountLedger::new(db.clone(), None);
            let sk = Arc::new(SigningKey::from_seed([7; 32]));
            let table = Table::new(engine, sk.clone(), ledger.clone(), db.clone());

            Self {
                table,
                ledger,
                db,
                sk,
            }
        }

        async fn player(&self, seed: u8, balance: u64) -> SigningKey {
            let sk = SigningKey::from_seed([seed; 32]);
            self.ledger
                .increment_balance(&sk.address(), Amount::from(balance))
                .await
                .unwrap();
            sk
        }

        async fn balance(&self, address: &Address) -> Amount {
            self.ledger.get_account(address).await.unwrap().balance
        }
    }

    fn table() -> Address {
        Address::new("table-1")
    }

    #[tokio::test]
    async fn join_moves_buy_in() {
        let tt = TestTable::new();
        let alice = tt.player(1, 1_500).await;

        let seat = tt
            .table
            .join(&alice.address(), Chips::new(1_000), None)
            .await
            .unwrap();
        assert_eq!(seat, 1);
        assert_eq!(tt.balance(&alice.address()).await, Amount::from(500u32));
        assert_eq!(tt.balance(&table()).await, Amount::from(1_000u32));

        // A failed join refunds the buy-in.
        let err = tt
            .table
            .join(&alice.address(), Chips::new(300), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameError>(),
            Some(GameError::AlreadyJoined(_))
        ));
        assert_eq!(tt.balance(&alice.address()).await, Amount::from(500u32));

        // Without funds the player is not seated.
        let bob = tt.player(2, 100).await;
        assert!(tt.table.join(&bob.address(), Chips::new(1_000), None).await.is_err());
        let dto = tt.table.snapshot(None).await.unwrap();
        assert_eq!(dto.players.len(), 1);
        assert_eq!(tt.balance(&bob.address()).await, Amount::from(100u32));
    }

    #[tokio::test]
    async fn signed_requests() {
        let tt = TestTable::new();
        let alice = tt.player(1, 1_000).await;
        let bob = tt.player(2, 1_000).await;

        for sk in [&alice, &bob] {
            let req = SignedRequest::new(
                sk,
                Request::Join {
                    table: table(),
                    buy_in: Chips::new(1_000),
                    seat: None,
                },
                1,
            );
            tt.table.request(req).await.unwrap();
        }

        let call = |nonce| {
            SignedRequest::new(
                &alice,
                Request::Action {
                    table: table(),
                    action: PlayerAction::Call,
                    amount: None,
                },
                nonce,
            )
        };

        let dto = tt.table.request(call(2)).await.unwrap();
        assert!(dto.verify(&tt.sk.verifying_key()));
        assert_eq!(dto.round, Round::Preflop);
        assert_eq!(dto.pots[0].amount, "40");
        assert!(dto.player(&alice.address()).unwrap().hole_cards.is_some());
        assert!(dto.player(&bob.address()).unwrap().hole_cards.is_none());

        // Replayed and wrong table requests are rejected.
        assert!(tt.table.request(call(2)).await.is_err());
        let wrong_table = SignedRequest::new(
            &bob,
            Request::Action {
                table: Address::new("table-2"),
                action: PlayerAction::Check,
                amount: None,
            },
            2,
        );
        assert!(tt.table.request(wrong_table).await.is_err());

        // The state is persisted.
        let saved = tt.db.load_table(table()).await.unwrap().unwrap();
        let engine = GameEngine::from_json(&saved).unwrap();
        assert_eq!(engine.pot(), Chips::new(40));
    }

    #[tokio::test]
    async fn leave_cashes_out() {
        let tt = TestTable::new();
        let alice = tt.player(1, 1_000).await;
        let bob = tt.player(2, 1_000).await;

        tt.table
            .join(&alice.address(), Chips::new(1_000), None)
            .await
            .unwrap();
        tt.table
            .join(&bob.address(), Chips::new(1_000), None)
            .await
            .unwrap();

        // Bob leaves after posting the big blind, alice wins the blinds.
        let chips = tt.table.leave(&bob.address()).await.unwrap();
        assert_eq!(chips, Chips::new(980));
        assert_eq!(tt.balance(&bob.address()).await, Amount::from(980u32));

        let chips = tt.table.leave(&alice.address()).await.unwrap();
        assert_eq!(chips, Chips::new(1_020));
        assert_eq!(tt.balance(&alice.address()).await, Amount::from(1_020u32));
        assert_eq!(tt.balance(&table()).await, Amount::from(0u32));

        assert!(tt.table.leave(&alice.address()).await.is_err());
    }

    #[tokio::test]
    async fn restores_broken_state() {
        let alice = SigningKey::from_seed([1; 32]);
        let bob = SigningKey::from_seed([2; 32]);

        let mut engine = GameEngine::new(table(), TableConfig::default()).unwrap();
        for sk in [&alice, &bob] {
            engine
                .join(Player::new(sk.address(), Chips::new(1_000)))
                .unwrap();
        }
        engine
            .perform_action(&alice.address(), PlayerAction::Call, None)
            .unwrap();

        // A state without cards left for the flop.
        let mut json = serde_json::to_value(&engine).unwrap();
        json["deck"]["next"] = 52.into();
        let engine = GameEngine::from_json(&json.to_string()).unwrap();

        let tt = TestTable::with_engine(engine);
        let check = SignedRequest::new(
            &bob,
            Request::Action {
                table: table(),
                action: PlayerAction::Check,
                amount: None,
            },
            1,
        );

        let err = tt.table.request(check).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameError>(),
            Some(GameError::Invariant(_))
        ));

        // The table is usable again from the last saved state.
        let dto = tt.table.snapshot(None).await.unwrap();
        assert_eq!(dto.round, Round::Preflop);
        assert_eq!(dto.pots[0].amount, "40");
        assert_eq!(dto.next_to_act, Some(2));
    }

    #[tokio::test]
    async fn spent_nonces_are_rejected() {
        let tt = TestTable::new();
        let alice = tt.player(1, 5_000).await;

        let join = |nonce| {
            SignedRequest::new(
                &alice,
                Request::Join {
                    table: table(),
                    buy_in: Chips::new(1_000),
                    seat: None,
                },
                nonce,
            )
        };
        let leave = SignedRequest::new(&alice, Request::Leave { table: table() }, 2);

        tt.table.request(join(1)).await.unwrap();
        tt.table.request(leave.clone()).await.unwrap();
        assert_eq!(tt.balance(&alice.address()).await, Amount::from(5_000u32));

        // An old join cannot move the player funds again.
        assert!(tt.table.request(join(1)).await.is_err());
        assert_eq!(tt.balance(&alice.address()).await, Amount::from(5_000u32));

        // A failed request spends its nonce.
        let bad_join = SignedRequest::new(
            &alice,
            Request::Join {
                table: table(),
                buy_in: Chips::new(50_000),
                seat: None,
            },
            3,
        );
        assert!(tt.table.request(bad_join.clone()).await.is_err());
        assert!(tt.table.request(bad_join).await.is_err());

        // Nonces survive a restart of the table.
        let saved = tt.db.load_table(table()).await.unwrap().unwrap();
        let engine = GameEngine::from_json(&saved).unwrap();
        let restarted = Table::new(engine, tt.sk.clone(), tt.ledger.clone(), tt.db.clone());
        assert!(restarted.request(join(1)).await.is_err());
        assert!(restarted.request(leave).await.is_err());
        assert_eq!(tt.balance(&alice.address()).await, Amount::from(5_000u32));

        restarted.request(join(4)).await.unwrap();
        assert_eq!(tt.balance(&alice.address()).await, Amount::from(4_000u32));
    }

    #[tokio::test]
    async fn failed_cash_out_keeps_player_seated() {
        let tt = TestTable::new();
        let alice = tt.player(1, 1_000).await;
        let bob = tt.player(2, 1_000).await;

        for sk in [&alice, &bob] {
            tt.table
                .join(&sk.address(), Chips::new(1_000), None)
                .await
                .unwrap();
        }

        let accounts = |sql: &'static str| {
            tt.db.blocking(move |conn| -> anyhow::Result<()> {
                conn.execute_batch(sql)?;
                Ok(())
            })
        };

        // Make the ledger storage fail.
        accounts("ALTER TABLE accounts RENAME TO accounts_off")
            .await
            .unwrap();
        assert!(tt.table.leave(&bob.address()).await.is_err());

        let dto = tt.table.snapshot(None).await.unwrap();
        assert!(dto.players.iter().any(|p| p.address == bob.address()));
        assert_eq!(dto.round, Round::Preflop);

        accounts("ALTER TABLE accounts_off RENAME TO accounts")
            .await
            .unwrap();
        assert_eq!(tt.balance(&table()).await, Amount::from(2_000u32));

        let chips = tt.table.leave(&bob.address()).await.unwrap();
        assert_eq!(chips, Chips::new(980));
        assert_eq!(tt.balance(&bob.address()).await, Amount::from(980u32));
        assert_eq!(tt.balance(&table()).await, Amount::from(1_020u32));

        let dto = tt.table.snapshot(None).await.unwrap();
        assert_eq!(dto.players.len(), 1);
    }
}
