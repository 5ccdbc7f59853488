//! The Agent Runtime: one [`Agent`] per simulated economic actor, wired to
//! one [`agora_core::link::Link`] and driving the two-phase value transfer,
//! trade, labor and information protocols (spec §4.3).

use crate::accounting::{self, Accounting};
use crate::balance::Balance;
use crate::catalog::ItemCatalog;
use crate::controller::Controller;
use crate::inventory::Inventory;
use crate::labor::{ContractHash, LaborContract, LaborContracts};
use crate::land::LandHoldings;
use crate::payloads::{
    CurrencyTransfer, InfoRequest, InfoResponse, ItemTransfer, LandTradeRequest,
    LandTradeRequestAck, LandTransfer, LaborApplication, LaborApplicationAck,
    LaborContractCancel, LaborContractCancelAck, TradeRequest, TradeRequestAck, TransferAck,
};
use crate::response_buffer::ResponseBuffer;
use crate::utility::UtilityParams;
use agora_core::cents::Cents;
use agora_core::error::Error;
use agora_core::ids::{AllocationTag, CorrelationId, EndpointId, ItemId};
use agora_core::link::EndpointHandle;
use agora_core::packet::{Packet, PacketKind};
use parking_lot::Mutex as SyncMutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::warn;

/// One simulated agent's full runtime state plus the link it uses to talk
/// to the rest of the substrate.
pub struct Agent {
    pub id: EndpointId,
    outbound: mpsc::Sender<Packet>,
    inbound: AsyncMutex<mpsc::Receiver<Packet>>,
    pub balance: Balance,
    pub inventory: Inventory,
    pub land: LandHoldings,
    pub labor_contracts: LaborContracts,
    pub accounting: Accounting,
    utility_functions: AsyncMutex<HashMap<ItemId, UtilityParams>>,
    response_buffer: ResponseBuffer,
    info_waiters: AsyncMutex<HashMap<CorrelationId, mpsc::Sender<InfoResponse>>>,
    controller: Arc<dyn Controller>,
    step: AtomicU64,
    /// Trade requests this agent (as seller) has already evaluated and
    /// accepted but not yet settled — keyed by buyer, awaiting the matching
    /// `CURRENCY_TRANSFER` before item delivery happens.
    pending_trades: SyncMutex<HashMap<EndpointId, VecDeque<TradeRequest>>>,
    pending_land_trades: SyncMutex<HashMap<EndpointId, VecDeque<LandTradeRequest>>>,
}

impl Agent {
    pub fn new(
        id: EndpointId,
        link: EndpointHandle,
        controller: Arc<dyn Controller>,
        shutdown: agora_fabric::ShutdownSignal,
        initial_balance: Cents,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            outbound: link.outbound,
            inbound: AsyncMutex::new(link.inbound),
            balance: Balance::new(initial_balance),
            inventory: Inventory::new(),
            land: LandHoldings::new(),
            labor_contracts: LaborContracts::new(),
            accounting: Accounting::new(),
            utility_functions: AsyncMutex::new(HashMap::new()),
            response_buffer: ResponseBuffer::new(shutdown),
            info_waiters: AsyncMutex::new(HashMap::new()),
            controller,
            step: AtomicU64::new(0),
            pending_trades: SyncMutex::new(HashMap::new()),
            pending_land_trades: SyncMutex::new(HashMap::new()),
        })
    }

    pub fn current_step(&self) -> u64 {
        self.step.load(Ordering::Relaxed)
    }

    pub async fn set_utility_params(&self, item: ItemId, params: UtilityParams) {
        self.utility_functions.lock().await.insert(item, params);
    }

    pub async fn utility_params(&self, item: &ItemId) -> Option<UtilityParams> {
        self.utility_functions.lock().await.get(item).copied()
    }

    async fn send(&self, packet: Packet) {
        if self.outbound.send(packet).await.is_err() {
            warn!(agent = %self.id, "outbound link closed; packet dropped");
        }
    }

    /// Drive this agent's inbound packet stream until the link closes.
    /// Intended to be spawned as its own task (spec §5: task-per-agent).
    ///
    /// Each packet's handling is itself spawned rather than awaited in this
    /// loop: some handlers (trade and land-trade settlement) send a request
    /// of their own and await the reply, and that reply can only ever be
    /// delivered by this same loop's next iteration. Awaiting a handler
    /// in-line would therefore deadlock the agent against itself the
    /// moment a handler needs a round trip.
    pub async fn run(self: Arc<Self>) {
        loop {
            let packet = {
                let mut inbound = self.inbound.lock().await;
                inbound.recv().await
            };
            let Some(packet) = packet else { break };
            let this = self.clone();
            tokio::spawn(async move { this.handle_packet(packet).await });
        }
    }

    async fn handle_packet(self: Arc<Self>, packet: Packet) {
        match packet.kind {
            PacketKind::CurrencyTransfer => self.recv_currency_transfer(packet).await,
            PacketKind::ItemTransfer => self.recv_item_transfer(packet).await,
            PacketKind::LandTransfer => self.recv_land_transfer(packet).await,
            PacketKind::CurrencyTransferAck
            | PacketKind::ItemTransferAck
            | PacketKind::LandTransferAck
            | PacketKind::TradeReqAck
            | PacketKind::LandTradeReqAck
            | PacketKind::LaborApplicationAck
            | PacketKind::LaborContractCancelAck => {
                if let Some(correlation_id) = packet.correlation_id {
                    self.response_buffer.fulfill(correlation_id, packet.payload).await;
                }
            }
            PacketKind::TradeReq => self.recv_trade_request(packet).await,
            PacketKind::LandTradeReq => self.recv_land_trade_request(packet).await,
            PacketKind::LaborApplication => self.recv_labor_application(packet).await,
            PacketKind::LaborContractCancel => self.recv_labor_contract_cancel(packet).await,
            PacketKind::InfoReq | PacketKind::InfoReqBroadcast => self.recv_info_request(packet).await,
            PacketKind::InfoResp => self.recv_info_response(packet).await,
            PacketKind::TickGrantBroadcast => {
                self.on_tick_grant(&packet).await;
                self.controller.receive_msg(&packet).await;
            }
            PacketKind::ControllerStart | PacketKind::ControllerStartBroadcast => {
                self.controller.controller_start(packet.payload.clone()).await;
            }
            _ => self.controller.receive_msg(&packet).await,
        }
    }

    async fn on_tick_grant(&self, _packet: &Packet) {
        let step = self.step.fetch_add(1, Ordering::Relaxed) + 1;
        for channel in [
            accounting::CURRENCY_INFLOW,
            accounting::CURRENCY_OUTFLOW,
            accounting::TRADE_REVENUE,
            accounting::LABOR_INCOME,
            accounting::PRODUCED_GOODS,
        ] {
            self.accounting.roll_step(channel);
        }
        self.labor_contracts.gc(step);
    }

    // --- Currency transfer (two-phase, spec §4.3) ---------------------

    pub async fn send_currency_transfer(&self, dest: &EndpointId, amount: Cents) -> Result<(), Error> {
        self.balance.debit(amount)?;
        let transfer_id = CorrelationId::new();
        let packet = Packet::new(
            self.id.clone(),
            Some(dest.clone()),
            PacketKind::CurrencyTransfer,
            Some(transfer_id),
            serde_json::to_value(CurrencyTransfer { transfer_id, amount }).unwrap(),
        );
        self.send(packet).await;
        let reply = self.response_buffer.wait(transfer_id).await;
        match reply {
            Ok(payload) => {
                let ack: TransferAck = serde_json::from_value(payload)
                    .map_err(|e| Error::protocol_violation(e.to_string()))?;
                if ack.success {
                    self.accounting.record(accounting::CURRENCY_OUTFLOW, Decimal::from(amount.value()));
                    Ok(())
                } else {
                    self.balance.credit(amount);
                    Err(Error::peer_rejected("currency transfer rejected by recipient"))
                }
            }
            Err(_) => {
                self.balance.credit(amount);
                Err(Error::peer_rejected("currency transfer ack never arrived"))
            }
        }
    }

    /// A plain `CURRENCY_TRANSFER` is credited unconditionally. One that
    /// settles a trade or land-trade this agent already accepted as seller
    /// is gated on delivering the matching goods first: see
    /// [`Self::settle_trade`]/[`Self::settle_land_trade`].
    async fn recv_currency_transfer(&self, packet: Packet) {
        let Ok(transfer) = serde_json::from_value::<CurrencyTransfer>(packet.payload.clone()) else {
            return;
        };
        let buyer_id = packet.sender_id.clone();

        if let Some(trade) = self.take_pending_trade(&buyer_id, transfer.amount) {
            self.settle_trade(buyer_id, packet.correlation_id, transfer, trade).await;
            return;
        }
        if let Some(land_trade) = self.take_pending_land_trade(&buyer_id, transfer.amount) {
            self.settle_land_trade(buyer_id, packet.correlation_id, transfer, land_trade).await;
            return;
        }

        self.balance.credit(transfer.amount);
        self.accounting.record(accounting::CURRENCY_INFLOW, Decimal::from(transfer.amount.value()));
        let ack = Packet::new(
            self.id.clone(),
            Some(buyer_id),
            PacketKind::CurrencyTransferAck,
            packet.correlation_id,
            serde_json::to_value(TransferAck {
                transfer_id: transfer.transfer_id,
                success: true,
            })
            .unwrap(),
        );
        self.send(ack).await;
    }

    // --- Item transfer (two-phase) -------------------------------------

    pub async fn send_item_transfer(&self, dest: &EndpointId, item: ItemId, amount: Decimal) -> Result<(), Error> {
        self.inventory.debit(&item, amount)?;
        let transfer_id = CorrelationId::new();
        let packet = Packet::new(
            self.id.clone(),
            Some(dest.clone()),
            PacketKind::ItemTransfer,
            Some(transfer_id),
            serde_json::to_value(ItemTransfer {
                transfer_id,
                item: item.clone(),
                amount,
            })
            .unwrap(),
        );
        self.send(packet).await;
        match self.response_buffer.wait(transfer_id).await {
            Ok(payload) => {
                let ack: TransferAck = serde_json::from_value(payload)
                    .map_err(|e| Error::protocol_violation(e.to_string()))?;
                if ack.success {
                    Ok(())
                } else {
                    self.inventory.credit(&item, amount);
                    Err(Error::peer_rejected("item transfer rejected by recipient"))
                }
            }
            Err(_) => {
                self.inventory.credit(&item, amount);
                Err(Error::peer_rejected("item transfer ack never arrived"))
            }
        }
    }

    async fn recv_item_transfer(&self, packet: Packet) {
        let Ok(transfer) = serde_json::from_value::<ItemTransfer>(packet.payload.clone()) else {
            return;
        };
        self.inventory.credit(&transfer.item, transfer.amount);
        let ack = Packet::new(
            self.id.clone(),
            Some(packet.sender_id),
            PacketKind::ItemTransferAck,
            packet.correlation_id,
            serde_json::to_value(TransferAck {
                transfer_id: transfer.transfer_id,
                success: true,
            })
            .unwrap(),
        );
        self.send(ack).await;
    }

    // --- Land transfer (two-phase) --------------------------------------

    pub async fn send_land_transfer(&self, dest: &EndpointId, allocation: AllocationTag, hectares: Decimal) -> Result<(), Error> {
        self.land.debit(&allocation, hectares)?;
        let transfer_id = CorrelationId::new();
        let packet = Packet::new(
            self.id.clone(),
            Some(dest.clone()),
            PacketKind::LandTransfer,
            Some(transfer_id),
            serde_json::to_value(LandTransfer {
                transfer_id,
                allocation: allocation.clone(),
                hectares,
            })
            .unwrap(),
        );
        self.send(packet).await;
        match self.response_buffer.wait(transfer_id).await {
            Ok(payload) => {
                let ack: TransferAck = serde_json::from_value(payload)
                    .map_err(|e| Error::protocol_violation(e.to_string()))?;
                if ack.success {
                    Ok(())
                } else {
                    self.land.credit(&allocation, hectares);
                    Err(Error::peer_rejected("land transfer rejected by recipient"))
                }
            }
            Err(_) => {
                self.land.credit(&allocation, hectares);
                Err(Error::peer_rejected("land transfer ack never arrived"))
            }
        }
    }

    async fn recv_land_transfer(&self, packet: Packet) {
        let Ok(transfer) = serde_json::from_value::<LandTransfer>(packet.payload.clone()) else {
            return;
        };
        self.land.credit(&transfer.allocation, transfer.hectares);
        let ack = Packet::new(
            self.id.clone(),
            Some(packet.sender_id),
            PacketKind::LandTransferAck,
            packet.correlation_id,
            serde_json::to_value(TransferAck {
                transfer_id: transfer.transfer_id,
                success: true,
            })
            .unwrap(),
        );
        self.send(ack).await;
    }

    // --- Trade request protocol (atomic currency <-> item swap) --------

    /// Buyer-initiated trade (spec §4.3 "Trade request protocol"). The
    /// buyer sends `TRADE_REQ` and waits for the seller's accept/reject
    /// before moving any funds; only on acceptance does the currency leg
    /// run, which is what actually triggers the seller's item delivery (see
    /// [`Self::settle_trade`]). A currency-leg failure after acceptance —
    /// whether local (insufficient funds) or reported by the seller after a
    /// failed delivery — is a completed-but-declined trade, not an error:
    /// nothing was delivered and no funds are left displaced.
    pub async fn execute_trade(
        &self,
        seller_id: &EndpointId,
        currency_amount: Cents,
        item_package: HashMap<ItemId, Decimal>,
    ) -> Result<bool, Error> {
        let correlation_id = CorrelationId::new();
        let request = TradeRequest {
            seller_id: seller_id.clone(),
            buyer_id: self.id.clone(),
            currency_amount,
            item_package,
        };
        let packet = Packet::new(
            self.id.clone(),
            Some(seller_id.clone()),
            PacketKind::TradeReq,
            Some(correlation_id),
            serde_json::to_value(&request).unwrap(),
        );
        self.send(packet).await;

        let ack: TradeRequestAck = match self.response_buffer.wait(correlation_id).await {
            Ok(payload) => {
                serde_json::from_value(payload).map_err(|e| Error::protocol_violation(e.to_string()))?
            }
            Err(_) => return Err(Error::peer_rejected("trade request ack never arrived")),
        };
        if !ack.accepted {
            return Ok(false);
        }

        match self.send_currency_transfer(seller_id, currency_amount).await {
            Ok(()) => {
                self.accounting.record(
                    accounting::TRADE_REVENUE,
                    -Decimal::from(currency_amount.value()),
                );
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Seller-side handling of an inbound `TRADE_REQ`: evaluate against the
    /// request's fields alone (no currency has moved yet) and, if accepted,
    /// record it as pending settlement. The ack reflects this evaluation
    /// decision only; final delivery waits for the buyer's `CURRENCY_TRANSFER`
    /// (see [`Self::recv_currency_transfer`]/[`Self::settle_trade`]).
    async fn recv_trade_request(&self, packet: Packet) {
        let Ok(request) = serde_json::from_value::<TradeRequest>(packet.payload.clone()) else {
            return;
        };
        let accepted = self.controller.eval_trade_request(&request);
        if accepted {
            self.pending_trades
                .lock()
                .entry(request.buyer_id.clone())
                .or_default()
                .push_back(request.clone());
        }

        let ack = Packet::new(
            self.id.clone(),
            Some(packet.sender_id),
            PacketKind::TradeReqAck,
            packet.correlation_id,
            serde_json::to_value(TradeRequestAck { accepted }).unwrap(),
        );
        self.send(ack).await;
    }

    fn take_pending_trade(&self, buyer_id: &EndpointId, currency_amount: Cents) -> Option<TradeRequest> {
        let mut pending = self.pending_trades.lock();
        let queue = pending.get_mut(buyer_id)?;
        let index = queue.iter().position(|request| request.currency_amount == currency_amount)?;
        let request = queue.remove(index);
        if queue.is_empty() {
            pending.remove(buyer_id);
        }
        request
    }

    /// Settle a previously-accepted trade once the matching `CURRENCY_TRANSFER`
    /// has arrived: deliver every item in the package first, and only credit
    /// the currency (acking success) if every delivery succeeds. On failure
    /// the currency is never credited, so the buyer's own rollback in
    /// [`Self::send_currency_transfer`] restores its balance without this
    /// side sending any separate refund.
    async fn settle_trade(
        &self,
        buyer_id: EndpointId,
        correlation_id: Option<CorrelationId>,
        transfer: CurrencyTransfer,
        trade: TradeRequest,
    ) {
        let mut delivered = true;
        for (item, amount) in &trade.item_package {
            if self
                .send_item_transfer(&buyer_id, item.clone(), *amount)
                .await
                .is_err()
            {
                delivered = false;
                break;
            }
        }

        if delivered {
            self.balance.credit(transfer.amount);
            self.accounting.record(accounting::CURRENCY_INFLOW, Decimal::from(transfer.amount.value()));
            self.accounting
                .record(accounting::TRADE_REVENUE, Decimal::from(transfer.amount.value()));
        }

        let ack = Packet::new(
            self.id.clone(),
            Some(buyer_id),
            PacketKind::CurrencyTransferAck,
            correlation_id,
            serde_json::to_value(TransferAck {
                transfer_id: transfer.transfer_id,
                success: delivered,
            })
            .unwrap(),
        );
        self.send(ack).await;
    }

    // --- Land trade request (same shape, land instead of item package) --

    pub async fn execute_land_trade(
        &self,
        seller_id: &EndpointId,
        currency_amount: Cents,
        allocation: AllocationTag,
        hectares: Decimal,
    ) -> Result<bool, Error> {
        let correlation_id = CorrelationId::new();
        let request = LandTradeRequest {
            seller_id: seller_id.clone(),
            buyer_id: self.id.clone(),
            currency_amount,
            allocation,
            hectares,
        };
        let packet = Packet::new(
            self.id.clone(),
            Some(seller_id.clone()),
            PacketKind::LandTradeReq,
            Some(correlation_id),
            serde_json::to_value(&request).unwrap(),
        );
        self.send(packet).await;

        let ack: LandTradeRequestAck = match self.response_buffer.wait(correlation_id).await {
            Ok(payload) => {
                serde_json::from_value(payload).map_err(|e| Error::protocol_violation(e.to_string()))?
            }
            Err(_) => return Err(Error::peer_rejected("land trade request ack never arrived")),
        };
        if !ack.accepted {
            return Ok(false);
        }

        match self.send_currency_transfer(seller_id, currency_amount).await {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    async fn recv_land_trade_request(&self, packet: Packet) {
        let Ok(request) = serde_json::from_value::<LandTradeRequest>(packet.payload.clone()) else {
            return;
        };
        let accepted = self.controller.eval_land_trade_request(&request);
        if accepted {
            self.pending_land_trades
                .lock()
                .entry(request.buyer_id.clone())
                .or_default()
                .push_back(request.clone());
        }
        let ack = Packet::new(
            self.id.clone(),
            Some(packet.sender_id),
            PacketKind::LandTradeReqAck,
            packet.correlation_id,
            serde_json::to_value(LandTradeRequestAck { accepted }).unwrap(),
        );
        self.send(ack).await;
    }

    fn take_pending_land_trade(
        &self,
        buyer_id: &EndpointId,
        currency_amount: Cents,
    ) -> Option<LandTradeRequest> {
        let mut pending = self.pending_land_trades.lock();
        let queue = pending.get_mut(buyer_id)?;
        let index = queue.iter().position(|request| request.currency_amount == currency_amount)?;
        let request = queue.remove(index);
        if queue.is_empty() {
            pending.remove(buyer_id);
        }
        request
    }

    async fn settle_land_trade(
        &self,
        buyer_id: EndpointId,
        correlation_id: Option<CorrelationId>,
        transfer: CurrencyTransfer,
        trade: LandTradeRequest,
    ) {
        let delivered = self
            .send_land_transfer(&buyer_id, trade.allocation.clone(), trade.hectares)
            .await
            .is_ok();

        if delivered {
            self.balance.credit(transfer.amount);
            self.accounting.record(accounting::CURRENCY_INFLOW, Decimal::from(transfer.amount.value()));
        }

        let ack = Packet::new(
            self.id.clone(),
            Some(buyer_id),
            PacketKind::CurrencyTransferAck,
            correlation_id,
            serde_json::to_value(TransferAck {
                transfer_id: transfer.transfer_id,
                success: delivered,
            })
            .unwrap(),
        );
        self.send(ack).await;
    }

    // --- Labor lifecycle (spec §4.3 "Labor lifecycle") -------------------

    /// Worker applies for a listing, carrying a contract derived from it.
    pub async fn apply_for_labor(&self, employer_id: &EndpointId, contract: LaborContract) -> Result<Option<LaborContract>, Error> {
        let correlation_id = CorrelationId::new();
        let packet = Packet::new(
            self.id.clone(),
            Some(employer_id.clone()),
            PacketKind::LaborApplication,
            Some(correlation_id),
            serde_json::to_value(LaborApplication { contract }).unwrap(),
        );
        self.send(packet).await;
        match self.response_buffer.wait(correlation_id).await {
            Ok(payload) => {
                let ack: LaborApplicationAck = serde_json::from_value(payload)
                    .map_err(|e| Error::protocol_violation(e.to_string()))?;
                if let Some(contract) = &ack.contract {
                    if ack.accepted {
                        self.labor_contracts.insert(contract.clone());
                    }
                }
                Ok(ack.contract.filter(|_| ack.accepted))
            }
            Err(_) => Err(Error::peer_rejected("labor application ack never arrived")),
        }
    }

    async fn recv_labor_application(&self, packet: Packet) {
        let Ok(application) = serde_json::from_value::<LaborApplication>(packet.payload.clone()) else {
            return;
        };
        let accepted = self.controller.eval_job_application(&application.contract);
        if accepted {
            self.labor_contracts.insert(application.contract.clone());
        }
        let ack = Packet::new(
            self.id.clone(),
            Some(packet.sender_id),
            PacketKind::LaborApplicationAck,
            packet.correlation_id,
            serde_json::to_value(LaborApplicationAck {
                accepted,
                contract: accepted.then_some(application.contract),
            })
            .unwrap(),
        );
        self.send(ack).await;
    }

    pub async fn cancel_labor_contract(&self, peer_id: &EndpointId, hash: ContractHash) -> Result<(), Error> {
        self.labor_contracts.remove(hash);
        let correlation_id = CorrelationId::new();
        let packet = Packet::new(
            self.id.clone(),
            Some(peer_id.clone()),
            PacketKind::LaborContractCancel,
            Some(correlation_id),
            serde_json::to_value(LaborContractCancel {
                contract_hash: hash.as_u64(),
            })
            .unwrap(),
        );
        self.send(packet).await;
        self.response_buffer
            .wait(correlation_id)
            .await
            .map(|_| ())
            .map_err(|_| Error::peer_rejected("labor contract cancel ack never arrived"))
    }

    async fn recv_labor_contract_cancel(&self, packet: Packet) {
        let Ok(cancel) = serde_json::from_value::<LaborContractCancel>(packet.payload.clone()) else {
            return;
        };
        self.labor_contracts.remove(ContractHash::from_u64(cancel.contract_hash));
        let ack = Packet::new(
            self.id.clone(),
            Some(packet.sender_id),
            PacketKind::LaborContractCancelAck,
            packet.correlation_id,
            serde_json::to_value(LaborContractCancelAck {
                contract_hash: cancel.contract_hash,
            })
            .unwrap(),
        );
        self.send(ack).await;
    }

    // --- Information request/response ------------------------------------

    /// Targeted `INFO_REQ`. Best-effort: returns `None` if no `INFO_RESP`
    /// arrived before `timeout` (spec §4.3: "no reliability guarantees").
    pub async fn request_info(
        &self,
        target: &EndpointId,
        info_key: String,
        timeout: std::time::Duration,
    ) -> Option<serde_json::Value> {
        let transaction_id = CorrelationId::new();
        let (tx, mut rx) = mpsc::channel(1);
        self.info_waiters.lock().await.insert(transaction_id, tx);

        let packet = Packet::new(
            self.id.clone(),
            Some(target.clone()),
            PacketKind::InfoReq,
            Some(transaction_id),
            serde_json::to_value(InfoRequest {
                requester_id: self.id.clone(),
                transaction_id,
                agent_filter: None,
                info_key,
            })
            .unwrap(),
        );
        self.send(packet).await;

        let result = tokio::time::timeout(timeout, rx.recv()).await.ok().flatten();
        self.info_waiters.lock().await.remove(&transaction_id);
        result.map(|resp| resp.info)
    }

    async fn recv_info_request(&self, packet: Packet) {
        let Ok(request) = serde_json::from_value::<InfoRequest>(packet.payload.clone()) else {
            return;
        };
        if packet.kind == PacketKind::InfoReqBroadcast {
            let matches = request
                .agent_filter
                .as_ref()
                .map(|needle| self.id.as_str().contains(needle.as_str()))
                .unwrap_or(true);
            if !matches {
                return;
            }
        }
        let info = self.describe(&request.info_key).await;
        let response = Packet::new(
            self.id.clone(),
            Some(request.requester_id),
            PacketKind::InfoResp,
            Some(request.transaction_id),
            serde_json::to_value(InfoResponse {
                transaction_id: request.transaction_id,
                info,
            })
            .unwrap(),
        );
        self.send(response).await;
    }

    async fn recv_info_response(&self, packet: Packet) {
        let Ok(response) = serde_json::from_value::<InfoResponse>(packet.payload.clone()) else {
            return;
        };
        if let Some(tx) = self.info_waiters.lock().await.get(&response.transaction_id) {
            let _ = tx.send(response).await;
        }
    }

    /// Answer a well-known `infoKey`. Extend as the controller layer needs
    /// more keys; unknown keys return `null`.
    async fn describe(&self, info_key: &str) -> serde_json::Value {
        match info_key {
            "balance" => serde_json::json!(self.balance.value().value()),
            "laborContractCount" => serde_json::json!(self.labor_contracts.len()),
            _ => serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;
    use agora_core::link::Link;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;

    struct AcceptAll {
        accept: AtomicBool,
    }

    #[async_trait]
    impl Controller for AcceptAll {
        async fn controller_start(&self, _initial_payload: serde_json::Value) {}
        async fn receive_msg(&self, _packet: &Packet) {}
        fn eval_trade_request(&self, _request: &TradeRequest) -> bool {
            self.accept.load(Ordering::Relaxed)
        }
        fn eval_job_application(&self, _contract: &LaborContract) -> bool {
            self.accept.load(Ordering::Relaxed)
        }
        fn eval_land_trade_request(&self, _request: &LandTradeRequest) -> bool {
            self.accept.load(Ordering::Relaxed)
        }
    }

    fn make_agent(id: &str, balance: u64) -> (Arc<Agent>, agora_core::link::FabricHandle) {
        let (endpoint, fabric_handle) = Link::new();
        let agent = Agent::new(
            EndpointId::new(id),
            endpoint,
            Arc::new(AcceptAll { accept: AtomicBool::new(true) }),
            agora_fabric::ShutdownSignal::new(),
            Cents::new(balance),
        );
        (agent, fabric_handle)
    }

    #[tokio::test]
    async fn currency_transfer_moves_funds_between_two_agents_via_a_fabric() {
        let fabric = agora_fabric::Fabric::new();
        let (alice, alice_fabric) = make_agent("alice", 1000);
        let (bob, bob_fabric) = make_agent("bob", 0);
        let alice_id = EndpointId::new("alice");
        let bob_id = EndpointId::new("bob");
        fabric.register(alice_id.clone(), alice_fabric).unwrap();
        fabric.register(bob_id.clone(), bob_fabric).unwrap();

        tokio::spawn(alice.clone().run());
        tokio::spawn(bob.clone().run());
        tokio::spawn({
            let fabric = fabric.clone();
            let id = alice_id.clone();
            async move { fabric.monitor(&id).await }
        });
        tokio::spawn({
            let fabric = fabric.clone();
            let id = bob_id.clone();
            async move { fabric.monitor(&id).await }
        });

        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            alice.send_currency_transfer(&bob_id, Cents::new(100)),
        )
        .await
        .expect("transfer timed out")
        .expect("transfer rejected");

        assert_eq!(alice.balance.value(), Cents::new(900));
        assert_eq!(bob.balance.value(), Cents::new(100));
    }

    fn spawn_and_connect(fabric: &agora_fabric::Fabric, agent: &Arc<Agent>, fabric_handle: agora_core::link::FabricHandle) {
        fabric.register(agent.id.clone(), fabric_handle).unwrap();
        tokio::spawn(agent.clone().run());
        let fabric = fabric.clone();
        let id = agent.id.clone();
        tokio::spawn(async move { fabric.monitor(&id).await });
    }

    #[tokio::test]
    async fn accepted_trade_moves_currency_one_way_and_the_item_the_other() {
        let fabric = agora_fabric::Fabric::new();
        let (buyer, buyer_fabric) = make_agent("buyer", 100);
        let (seller, seller_fabric) = make_agent("seller", 0);
        let seller_id = EndpointId::new("seller");
        let apple = ItemId::new("apple");
        seller.inventory.credit(&apple, Decimal::from(5));

        spawn_and_connect(&fabric, &buyer, buyer_fabric);
        spawn_and_connect(&fabric, &seller, seller_fabric);

        let mut item_package = HashMap::new();
        item_package.insert(apple.clone(), Decimal::from(1));

        let accepted = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            buyer.execute_trade(&seller_id, Cents::new(10), item_package),
        )
        .await
        .expect("trade timed out")
        .expect("trade errored");

        assert!(accepted);
        assert_eq!(buyer.balance.value(), Cents::new(90));
        assert_eq!(buyer.inventory.quantity(&apple), Decimal::from(1));
        assert_eq!(seller.balance.value(), Cents::new(10));
        assert_eq!(seller.inventory.quantity(&apple), Decimal::from(4));
    }

    #[tokio::test]
    async fn trade_declines_cleanly_when_the_buyer_cannot_afford_it() {
        let fabric = agora_fabric::Fabric::new();
        let (buyer, buyer_fabric) = make_agent("buyer", 5);
        let (seller, seller_fabric) = make_agent("seller", 0);
        let seller_id = EndpointId::new("seller");
        let apple = ItemId::new("apple");
        seller.inventory.credit(&apple, Decimal::from(5));

        spawn_and_connect(&fabric, &buyer, buyer_fabric);
        spawn_and_connect(&fabric, &seller, seller_fabric);

        let mut item_package = HashMap::new();
        item_package.insert(apple.clone(), Decimal::from(1));

        let accepted = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            buyer.execute_trade(&seller_id, Cents::new(10), item_package),
        )
        .await
        .expect("trade timed out")
        .expect("trade errored");

        assert!(!accepted);
        assert_eq!(buyer.balance.value(), Cents::new(5));
        assert_eq!(buyer.inventory.quantity(&apple), Decimal::ZERO);
        assert_eq!(seller.balance.value(), Cents::new(0));
        assert_eq!(seller.inventory.quantity(&apple), Decimal::from(5));
    }

    #[tokio::test]
    async fn trade_declines_cleanly_when_the_seller_rejects_it() {
        let fabric = agora_fabric::Fabric::new();
        let (buyer, buyer_fabric) = make_agent("buyer", 100);
        let (endpoint, seller_fabric) = Link::new();
        let seller = Agent::new(
            EndpointId::new("seller"),
            endpoint,
            Arc::new(AcceptAll { accept: AtomicBool::new(false) }),
            agora_fabric::ShutdownSignal::new(),
            Cents::new(0),
        );
        let seller_id = EndpointId::new("seller");
        let apple = ItemId::new("apple");
        seller.inventory.credit(&apple, Decimal::from(5));

        spawn_and_connect(&fabric, &buyer, buyer_fabric);
        spawn_and_connect(&fabric, &seller, seller_fabric);

        let mut item_package = HashMap::new();
        item_package.insert(apple.clone(), Decimal::from(1));

        let accepted = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            buyer.execute_trade(&seller_id, Cents::new(10), item_package),
        )
        .await
        .expect("trade timed out")
        .expect("trade errored");

        assert!(!accepted);
        assert_eq!(buyer.balance.value(), Cents::new(100));
        assert_eq!(seller.balance.value(), Cents::new(0));
        assert_eq!(seller.inventory.quantity(&apple), Decimal::from(5));
    }
}
